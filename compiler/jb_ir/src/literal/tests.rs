use jb_types::TypeId;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

#[test]
fn equal_pairs_are_interned() {
    let mut dict = LiteralDictionary::new();
    let a = dict.register(TypeId::INT32, &7i32.to_le_bytes());
    let b = dict.register(TypeId::INT32, &7i32.to_le_bytes());
    let c = dict.register(TypeId::INT32, &8i32.to_le_bytes());
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(dict.len(), 2);
}

#[test]
fn same_bytes_different_type_are_distinct() {
    let mut dict = LiteralDictionary::new();
    let a = dict.register(TypeId::INT32, &[0, 0, 0, 0]);
    let b = dict.register(TypeId::FLOAT32, &[0, 0, 0, 0]);
    assert_ne!(a, b);
}

#[test]
fn integer_encoding() {
    assert_eq!(int_bytes(-2, 16).as_slice(), &[0xfe, 0xff]);
    assert_eq!(int_bytes(0x1234, 8).as_slice(), &[0x34]);
    assert_eq!(resize_int_bytes(&[0xfe], 4).as_slice(), &[0xfe, 0xff, 0xff, 0xff]);
    assert_eq!(resize_int_bytes(&[0x05], 2).as_slice(), &[0x05, 0x00]);
    assert_eq!(resize_int_bytes(&[1, 2, 3, 4], 2).as_slice(), &[1, 2]);
}

#[test]
fn readers() {
    let mut dict = LiteralDictionary::new();
    let i = dict.register(TypeId::INT16, &int_bytes(-300, 16));
    assert_eq!(dict.get(i).unwrap().as_i64(), -300);
    let f = dict.register(TypeId::FLOAT64, &2.5f64.to_le_bytes());
    assert_eq!(dict.get(f).unwrap().as_f64(), Some(2.5));
    let g = dict.register(TypeId::FLOAT32, &1.5f32.to_le_bytes());
    assert_eq!(dict.get(g).unwrap().as_f64(), Some(1.5));
}

#[test]
fn removal_forgets_interning() {
    let mut dict = LiteralDictionary::new();
    let a = dict.register(TypeId::INT8, &[1]);
    dict.remove(a).unwrap();
    let b = dict.register(TypeId::INT8, &[1]);
    assert_ne!(a, b);
    assert_eq!(dict.ids(), vec![b]);
}

#[test]
fn linked_shares_vocabulary() {
    let mut base = LiteralDictionary::new();
    let one = base.register(TypeId::INT32, &1i32.to_le_bytes());
    let mut child = LiteralDictionary::linked(&base, "base");
    assert_eq!(child.register(TypeId::INT32, &1i32.to_le_bytes()), one);
    let two = child.register(TypeId::INT32, &2i32.to_le_bytes());
    assert_eq!(two.raw(), 1);
    assert!(base.lookup(two).is_none());
}

proptest! {
    #[test]
    fn interning_is_structural(
        ty in 1u32..8,
        a in proptest::collection::vec(any::<u8>(), 0..12),
        b in proptest::collection::vec(any::<u8>(), 0..12),
    ) {
        let ty = TypeId::from_raw(ty);
        let mut dict = LiteralDictionary::new();
        let la = dict.register(ty, &a);
        let lb = dict.register(ty, &b);
        prop_assert_eq!(la == lb, a == b);
        prop_assert_eq!(dict.get(la).unwrap().bytes(), a.as_slice());
    }

    #[test]
    fn int_round_trip(value in any::<i64>(), bits in prop::sample::select(vec![8u64, 16, 32, 64])) {
        let bytes = int_bytes(value, bits);
        let shift = 64 - bits;
        let expected = (value << shift) >> shift;
        prop_assert_eq!(read_signed(&bytes), expected);
    }
}
