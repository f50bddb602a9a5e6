//! Bit-level chromosome codec for the genetic algorithm.
//!
//! A chromosome is a flat bit buffer. Descriptors are laid out back to back
//! in declaration order, bit `i` of the buffer living in byte `i / 8` at
//! position `i % 8` (least significant first). Each run of bits is an
//! unsigned little-endian integer code.
//!
//! A bounded range with `steps = ceil((max - min) / step)` gets
//! `ceil(log2(steps))` bits. That width is a power-of-two upper bound, so a
//! code can exceed `steps`; it is folded back with `code % steps`, which
//! keeps every decoded value inside `[min, max]`.

use crate::descriptor::{ParameterKind, ParameterSpace, ValueType};
use crate::value::ParameterValueSet;
use crate::ProtocolError;

/// Number of distinct codes a bounded range maps to.
fn double_steps(min: f64, max: f64, step: f64) -> u64 {
    ((max - min) / step).ceil() as u64
}

/// The span of any `i64` range fits in `u64`, so the count does too once
/// `step >= 1`.
fn int_steps(min: i64, max: i64, step: i64) -> u64 {
    let span = (i128::from(max) - i128::from(min)) as u128;
    span.div_ceil(step as u128) as u64
}

/// `ceil(log2(steps))`, zero when there is at most one code.
fn bits_for_steps(steps: u64) -> usize {
    if steps <= 1 {
        return 0;
    }
    (u64::BITS - (steps - 1).leading_zeros()) as usize
}

fn value_bits(value_type: ValueType) -> usize {
    match value_type {
        ValueType::Double => 64,
        ValueType::Int => 32,
        ValueType::Bool => 1,
    }
}

/// Bits one slot of this kind occupies.
fn slot_bits(kind: &ParameterKind) -> usize {
    match *kind {
        ParameterKind::DoubleRange { min, max, step } => bits_for_steps(double_steps(min, max, step)),
        ParameterKind::IntRange { min, max, step } | ParameterKind::IntInterval { min, max, step } => {
            bits_for_steps(int_steps(min, max, step))
        }
        ParameterKind::Value { value_type } => value_bits(value_type),
    }
}

/// Bits a descriptor of this kind occupies in a chromosome.
pub fn bits_needed(kind: &ParameterKind) -> usize {
    slot_bits(kind) * kind.slots()
}

/// Total chromosome width for a parameter space.
pub fn total_bits(space: &ParameterSpace) -> usize {
    space.descriptors().iter().map(|d| bits_needed(&d.kind)).sum()
}

/// Reads little-endian codes from a bit buffer.
struct BitReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> BitReader<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Read `width` bits (at most 64). The caller checks the length up front.
    fn read(&mut self, width: usize) -> u64 {
        let mut code = 0u64;
        for b in 0..width {
            let bit = self.position + b;
            if self.buffer[bit / 8] & (1 << (bit % 8)) != 0 {
                code |= 1 << b;
            }
        }
        self.position += width;
        code
    }
}

/// Writes little-endian codes into a bit buffer.
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    position: usize,
}

impl BitWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the low `width` bits of `code`.
    pub fn write(&mut self, code: u64, width: usize) {
        for b in 0..width {
            let bit = self.position + b;
            if bit / 8 >= self.bytes.len() {
                self.bytes.push(0);
            }
            if code & (1 << b) != 0 {
                self.bytes[bit / 8] |= 1 << (bit % 8);
            }
        }
        self.position += width;
    }

    /// Finish into a byte buffer, padding the last byte with zeros.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn decode_slot(kind: &ParameterKind, code: u64) -> f64 {
    match *kind {
        ParameterKind::DoubleRange { min, max, step } => {
            let steps = double_steps(min, max, step);
            if steps == 0 {
                return min;
            }
            min + (code % steps) as f64 * step
        }
        ParameterKind::IntRange { min, max, step } | ParameterKind::IntInterval { min, max, step } => {
            let steps = int_steps(min, max, step);
            if steps == 0 {
                return min as f64;
            }
            (i128::from(min) + i128::from(code % steps) * i128::from(step)) as f64
        }
        ParameterKind::Value { value_type } => match value_type {
            ValueType::Double => f64::from_bits(code),
            ValueType::Int => code as u32 as i32 as f64,
            ValueType::Bool => {
                if code != 0 {
                    1.0
                } else {
                    0.0
                }
            }
        },
    }
}

/// Decode a chromosome into one value per slot.
pub fn decode(buffer: &[u8], space: &ParameterSpace) -> Result<ParameterValueSet, ProtocolError> {
    let needed = total_bits(space);
    let available = buffer.len() * 8;
    if available < needed {
        return Err(ProtocolError::InsufficientBits { available, needed });
    }

    let mut reader = BitReader::new(buffer);
    let mut values = Vec::with_capacity(space.slot_count());

    for descriptor in space.descriptors() {
        let width = slot_bits(&descriptor.kind);
        for _ in 0..descriptor.slots() {
            let code = reader.read(width);
            values.push(decode_slot(&descriptor.kind, code));
        }
    }

    Ok(ParameterValueSet::new(values))
}

/// Encode raw codes, one per slot, at each slot's minimal width.
///
/// Codes wider than their slot are truncated to the slot width.
pub fn encode(codes: &[u64], space: &ParameterSpace) -> Result<Vec<u8>, ProtocolError> {
    if codes.len() != space.slot_count() {
        return Err(ProtocolError::SlotCountMismatch {
            expected: space.slot_count(),
            actual: codes.len(),
        });
    }

    let mut writer = BitWriter::new();
    let mut codes = codes.iter();
    for descriptor in space.descriptors() {
        let width = slot_bits(&descriptor.kind);
        for code in codes.by_ref().take(descriptor.slots()) {
            writer.write(*code, width);
        }
    }

    Ok(writer.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParameterDescriptor;

    fn range(min: i64, max: i64, step: i64) -> ParameterKind {
        ParameterKind::IntRange { min, max, step }
    }

    #[test]
    fn test_bits_for_eight_steps() {
        assert_eq!(bits_needed(&range(0, 7, 1)), 3);
        assert_eq!(bits_needed(&range(0, 8, 1)), 3);
        assert_eq!(bits_needed(&range(0, 9, 1)), 4);
    }

    #[test]
    fn test_bits_monotonic_in_steps() {
        let mut last = 0;
        for max in 1..=300 {
            let bits = bits_needed(&range(0, max, 1));
            assert!(bits >= last, "bits dropped at max={max}");
            last = bits;
        }
    }

    #[test]
    fn test_degenerate_ranges_need_no_bits() {
        assert_eq!(bits_needed(&range(5, 5, 1)), 0);
        assert_eq!(bits_needed(&range(0, 1, 1)), 0);
        assert_eq!(
            bits_needed(&ParameterKind::DoubleRange {
                min: 1.0,
                max: 1.0,
                step: 0.5
            }),
            0
        );
    }

    #[test]
    fn test_fixed_widths_for_values() {
        assert_eq!(bits_needed(&ParameterKind::Value { value_type: ValueType::Double }), 64);
        assert_eq!(bits_needed(&ParameterKind::Value { value_type: ValueType::Int }), 32);
        assert_eq!(bits_needed(&ParameterKind::Value { value_type: ValueType::Bool }), 1);
    }

    #[test]
    fn test_interval_takes_two_runs() {
        assert_eq!(
            bits_needed(&ParameterKind::IntInterval {
                min: 0,
                max: 15,
                step: 1
            }),
            8
        );
    }

    #[test]
    fn test_decode_reproduces_codes_modulo_steps() {
        let space = ParameterSpace::new(vec![
            ParameterDescriptor::int_range("a", 0, 7, 1),
            ParameterDescriptor::double_range("b", -1.0, 1.0, 0.25),
        ])
        .unwrap();

        // a: 7 steps in 3 bits, b: 8 steps in 3 bits
        for a in 0..8u64 {
            for b in 0..8u64 {
                let buffer = encode(&[a, b], &space).unwrap();
                let values = decode(&buffer, &space).unwrap();
                assert_eq!(values.as_slice()[0], (a % 7) as f64);
                assert_eq!(values.as_slice()[1], -1.0 + (b % 8) as f64 * 0.25);
            }
        }
    }

    #[test]
    fn test_decoded_values_stay_in_bounds() {
        let space = ParameterSpace::new(vec![ParameterDescriptor::int_range("n", 10, 110, 10)]).unwrap();
        for byte in 0..=255u8 {
            let value = decode(&[byte], &space).unwrap().as_slice()[0];
            assert!((10.0..=110.0).contains(&value));
        }
    }

    #[test]
    fn test_bit_order_is_lsb_first_across_bytes() {
        let space = ParameterSpace::new(vec![
            ParameterDescriptor::value("flag", ValueType::Bool),
            ParameterDescriptor::value("count", ValueType::Int),
        ])
        .unwrap();

        // flag = bit 0, count = bits 1..33
        let count: u32 = 0x8000_0001;
        let raw = ((count as u64) << 1) | 1;
        let buffer = raw.to_le_bytes()[..5].to_vec();

        let values = decode(&buffer, &space).unwrap();
        assert_eq!(values.as_slice(), &[1.0, i32::MIN as f64 + 1.0]);
    }

    #[test]
    fn test_double_value_is_bit_pattern() {
        let space = ParameterSpace::new(vec![ParameterDescriptor::value("x", ValueType::Double)]).unwrap();
        let values = decode(&2.75f64.to_bits().to_le_bytes(), &space).unwrap();
        assert_eq!(values.as_slice(), &[2.75]);
    }

    #[test]
    fn test_insufficient_bits() {
        let space = ParameterSpace::new(vec![
            ParameterDescriptor::value("x", ValueType::Int),
            ParameterDescriptor::value("flag", ValueType::Bool),
        ])
        .unwrap();

        assert_eq!(
            decode(&[0; 4], &space).unwrap_err(),
            ProtocolError::InsufficientBits {
                available: 32,
                needed: 33
            }
        );
        assert!(decode(&[0; 5], &space).is_ok());
    }
    #[test]
    fn test_full_i64_range_does_not_overflow() {
        let space =
            ParameterSpace::new(vec![ParameterDescriptor::int_range("n", i64::MIN, i64::MAX, 1)]).unwrap();
        assert_eq!(total_bits(&space), 64);

        let low = decode(&encode(&[0], &space).unwrap(), &space).unwrap();
        assert_eq!(low.as_slice(), &[i64::MIN as f64]);

        let high = decode(&encode(&[u64::MAX - 1], &space).unwrap(), &space).unwrap();
        assert_eq!(high.as_slice(), &[(i64::MAX - 1) as f64]);

        // u64::MAX folds back onto the first code
        let folded = decode(&[0xff; 8], &space).unwrap();
        assert_eq!(folded.as_slice(), &[i64::MIN as f64]);
    }

    #[test]
    fn test_wide_step_stays_in_bounds() {
        let space = ParameterSpace::new(vec![ParameterDescriptor::int_interval(
            "band",
            i64::MIN,
            i64::MAX,
            i64::MAX,
        )])
        .unwrap();
        assert_eq!(total_bits(&space), 2 * 2);

        let values = decode(&[0xff], &space).unwrap();
        for value in values.as_slice() {
            assert!((i64::MIN as f64..=i64::MAX as f64).contains(value));
        }
    }
}
