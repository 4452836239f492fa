//! Range values: `start .. stop` with an optional explicit step.
//!
//! After normalization a range always carries all three fields; the
//! stop bound is exclusive, and a missing step becomes 1 or -1
//! depending on the direction.

use crate::error::NlError;
use crate::types::ScalarKind;

use super::fraction::Fraction;
use super::tensor::Tensor;
use super::Object;

/// A normalized numeric range.
#[derive(Debug, Clone)]
pub struct RangeData {
    pub start: Object,
    pub stop: Object,
    pub step: Object,
}

impl RangeData {
    /// Normalize: all parts numeric scalars, step non-zero with a sign
    /// consistent with `stop - start`; a missing step is inferred.
    pub fn new(start: Object, stop: Object, step: Option<Object>) -> Result<RangeData, NlError> {
        for (label, part) in [("start", &start), ("stop", &stop)] {
            if !part.is_numeric_scalar() {
                return Err(NlError::type_error(format!(
                    "range {label} must be a numeric scalar"
                )));
            }
        }

        let descending = stop.number_value()? < start.number_value()?;
        let step = match step {
            Some(step) => {
                if !step.is_numeric_scalar() {
                    return Err(NlError::type_error(
                        "range step must be a numeric scalar".to_string(),
                    ));
                }
                let value = step.number_value()?;
                if value == 0.0 {
                    return Err(NlError::value("range step is zero".to_string()));
                }
                if (value < 0.0) != descending && stop.number_value()? != start.number_value()? {
                    return Err(NlError::value(format!(
                        "range step {value} walks away from the stop bound"
                    )));
                }
                step
            }
            None => Object::int(if descending { -1 } else { 1 }),
        };

        Ok(RangeData { start, stop, step })
    }

    fn is_exact(&self) -> bool {
        [&self.start, &self.stop, &self.step]
            .iter()
            .all(|o| o.as_i64().is_some() || o.as_fraction().is_some())
    }

    /// Enumerate the range, stop-exclusive.
    pub fn enumerate(&self) -> Result<Vec<Object>, NlError> {
        if self.is_exact() && self.has_fraction() {
            return self.enumerate_fractions();
        }
        if let (Some(start), Some(stop), Some(step)) =
            (self.start.as_i64(), self.stop.as_i64(), self.step.as_i64())
        {
            let mut out = Vec::new();
            let mut current = start;
            while (step > 0 && current < stop) || (step < 0 && current > stop) {
                out.push(Object::int(current));
                current += step;
            }
            return Ok(out);
        }

        let start = self.start.number_value()?;
        let stop = self.stop.number_value()?;
        let step = self.step.number_value()?;
        let mut out = Vec::new();
        let mut index = 0u64;
        loop {
            let current = start + step * index as f64;
            if (step > 0.0 && current >= stop - 1e-12) || (step < 0.0 && current <= stop + 1e-12) {
                break;
            }
            out.push(Object::float(current));
            index += 1;
        }
        Ok(out)
    }

    fn has_fraction(&self) -> bool {
        [&self.start, &self.stop, &self.step]
            .iter()
            .any(|o| o.as_fraction().is_some())
    }

    fn enumerate_fractions(&self) -> Result<Vec<Object>, NlError> {
        let to_fraction = |o: &Object| -> Fraction {
            o.as_fraction()
                .cloned()
                .or_else(|| o.as_i64().map(Fraction::from_i64))
                .expect("checked exact")
        };
        let start = to_fraction(&self.start);
        let stop = to_fraction(&self.stop);
        let step = to_fraction(&self.step);
        let ascending = matches!(
            start.compare(&stop),
            std::cmp::Ordering::Less | std::cmp::Ordering::Equal
        );

        let mut out = Vec::new();
        let mut current = start;
        loop {
            let order = current.compare(&stop);
            let done = if ascending {
                order != std::cmp::Ordering::Less
            } else {
                order != std::cmp::Ordering::Greater
            };
            if done {
                break;
            }
            out.push(Object::fraction(current.clone()));
            current = current.add(&step);
        }
        Ok(out)
    }

    /// Element count without materializing.
    pub fn len(&self) -> Result<usize, NlError> {
        Ok(self.enumerate()?.len())
    }

    /// Slice bounds over a container of `len` elements: `(from, to, step)`.
    pub fn slice_bounds(&self, len: usize) -> Result<(i64, i64, i64), NlError> {
        let resolve = |o: &Object| -> Result<i64, NlError> {
            let v = o
                .as_i64()
                .ok_or_else(|| NlError::type_error("slice bound must be an integer".to_string()))?;
            Ok(if v < 0 { len as i64 + v } else { v })
        };
        let from = resolve(&self.start)?;
        let to = resolve(&self.stop)?;
        let step = self
            .step
            .as_i64()
            .ok_or_else(|| NlError::type_error("slice step must be an integer".to_string()))?;
        Ok((from, to, step))
    }

    /// Scalar kind produced by enumeration, for tensor construction.
    pub fn element_kind(&self) -> ScalarKind {
        if [&self.start, &self.stop, &self.step]
            .iter()
            .all(|o| o.as_i64().is_some())
        {
            ScalarKind::Int64
        } else {
            ScalarKind::Float64
        }
    }

    /// Enumerate into a tensor vector.
    pub fn to_tensor(&self) -> Result<Tensor, NlError> {
        let values = self.enumerate()?;
        let mut elements = Vec::with_capacity(values.len());
        let mut kind = ScalarKind::Bool;
        for value in &values {
            match value.as_i64() {
                Some(v) => {
                    kind = kind.max(ScalarKind::narrowest_int(v));
                    elements.push(super::tensor::Scalar::Int(v));
                }
                None => {
                    kind = kind.max(ScalarKind::Float64);
                    elements.push(super::tensor::Scalar::Float(value.number_value()?));
                }
            }
        }
        let len = elements.len();
        Tensor::from_elements(kind, vec![len], elements)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ints(range: &RangeData) -> Vec<i64> {
        range
            .enumerate()
            .unwrap()
            .iter()
            .map(|o| o.as_i64().unwrap())
            .collect()
    }

    #[test]
    fn stop_is_exclusive() {
        let range = RangeData::new(Object::int(0), Object::int(5), None).unwrap();
        assert_eq!(ints(&range), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn descending_step_is_inferred() {
        let range = RangeData::new(Object::int(5), Object::int(0), None).unwrap();
        assert_eq!(ints(&range), vec![5, 4, 3, 2, 1]);
        assert_eq!(range.step.as_i64(), Some(-1));
    }

    #[test]
    fn explicit_step() {
        let range =
            RangeData::new(Object::int(0), Object::int(10), Some(Object::int(3))).unwrap();
        assert_eq!(ints(&range), vec![0, 3, 6, 9]);
    }

    #[test]
    fn zero_step_is_rejected() {
        let err = RangeData::new(Object::int(0), Object::int(5), Some(Object::int(0)));
        assert!(err.is_err());
    }

    #[test]
    fn inconsistent_step_sign_is_rejected() {
        let err = RangeData::new(Object::int(0), Object::int(5), Some(Object::int(-1)));
        assert!(err.is_err());
    }

    #[test]
    fn float_enumeration() {
        let range = RangeData::new(
            Object::int(0),
            Object::float(1.0),
            Some(Object::float(0.25)),
        )
        .unwrap();
        let values: Vec<f64> = range
            .enumerate()
            .unwrap()
            .iter()
            .map(|o| o.number_value().unwrap())
            .collect();
        assert_eq!(values, vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn normalized_range_has_three_fields() {
        let range = RangeData::new(Object::int(1), Object::int(4), None).unwrap();
        assert!(range.start.is_numeric_scalar());
        assert!(range.stop.is_numeric_scalar());
        assert!(range.step.is_numeric_scalar());
    }
}
