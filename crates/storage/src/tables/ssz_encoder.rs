use std::{any::type_name, fmt::Debug};

use redb::{TypeName, Value};
use ssz::{Decode, Encode};

/// Stores a value in redb as its SSZ bytes.
#[derive(Debug)]
pub struct SSZEncoding<T>(pub T);

impl<T> Value for SSZEncoding<T>
where
    T: Debug + Encode + Decode,
{
    type SelfType<'a>
        = T
    where
        Self: 'a;

    type AsBytes<'a>
        = Vec<u8>
    where
        Self: 'a;

    fn fixed_width() -> Option<usize> {
        if <T as Decode>::is_ssz_fixed_len() {
            Some(<T as Decode>::ssz_fixed_len())
        } else {
            None
        }
    }

    fn from_bytes<'a>(data: &'a [u8]) -> Self::SelfType<'a>
    where
        Self: 'a,
    {
        // redb only hands back bytes it was given by `as_bytes`.
        T::from_ssz_bytes(data).expect("Failed to decode SSZ bytes, data corruption?")
    }

    fn as_bytes<'a, 'b: 'a>(value: &'a Self::SelfType<'b>) -> Self::AsBytes<'a>
    where
        Self: 'a,
        Self: 'b,
    {
        value.as_ssz_bytes()
    }

    fn type_name() -> TypeName {
        TypeName::new(&format!("SSZEncoding<{}>", type_name::<T>()))
    }
}
