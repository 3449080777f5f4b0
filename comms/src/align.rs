/// Primitive numbers that can back a receive buffer.
pub trait Align1: bytemuck::Pod {}

/// Primitive numbers whose alignment is at least 4 bytes, so that `f32` and `u32`
/// payloads can be borrowed straight out of a receive buffer made of them.
pub trait Align4: Align1 {}

macro_rules! impl_align {
    ($trait:ident: $($ty:ty),+) => {
        $(impl $trait for $ty {})+
    };
}

impl_align!(Align1: u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);
impl_align!(Align4: u32, i32, u64, i64, f32, f64);
