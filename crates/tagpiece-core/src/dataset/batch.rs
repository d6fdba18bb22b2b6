use candle_core::{Device, Tensor};

use crate::dataset::EncodedExample;
use crate::error::{Result, TagpieceError};

/// A batch of encoded examples ready for the model.
///
/// Every tensor is `u32` with shape `[batch_size, seq_len]`.
#[derive(Debug, Clone)]
pub struct Batch {
    pub input_ids: Tensor,
    /// 1 = real token, 0 = padding.
    pub attention_mask: Tensor,
    pub subtoken_check: Option<Tensor>,
    pub target: Option<Tensor>,
}

impl Batch {
    /// Stack examples into a batch.
    ///
    /// # Errors
    /// - [`TagpieceError::ShapeMismatch`] if any stream of any example has a
    ///   different length than the first example's `input_ids`.
    /// - [`TagpieceError::Validation`] for an empty slice, or when only some
    ///   examples carry an optional stream.
    pub fn collate(examples: &[EncodedExample], device: &Device) -> Result<Self> {
        let first = examples
            .first()
            .ok_or_else(|| TagpieceError::Validation("cannot collate an empty batch".into()))?;
        let seq_len = first.len();

        for example in examples {
            check_len(seq_len, example.input_ids.len())?;
            check_len(seq_len, example.attention_mask.len())?;
            if let Some(check) = &example.subtoken_check {
                check_len(seq_len, check.len())?;
            }
            if let Some(target) = &example.target {
                check_len(seq_len, target.len())?;
            }
        }

        let input_ids = stack(examples.iter().map(|e| e.input_ids.as_slice()), seq_len, device)?;
        let attention_mask =
            stack(examples.iter().map(|e| e.attention_mask.as_slice()), seq_len, device)?;
        let subtoken_check =
            stack_optional(examples, |e| e.subtoken_check.as_deref(), seq_len, device)?;
        let target = stack_optional(examples, |e| e.target.as_deref(), seq_len, device)?;

        Ok(Self {
            input_ids,
            attention_mask,
            subtoken_check,
            target,
        })
    }

    /// Number of examples in the batch.
    pub fn size(&self) -> usize {
        self.input_ids.dims().first().copied().unwrap_or(0)
    }

    /// Sequence length shared by all examples.
    pub fn seq_len(&self) -> usize {
        self.input_ids.dims().get(1).copied().unwrap_or(0)
    }
}

fn check_len(expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(TagpieceError::ShapeMismatch { expected, found });
    }
    Ok(())
}

fn stack<'a, I>(rows: I, seq_len: usize, device: &Device) -> Result<Tensor>
where
    I: ExactSizeIterator<Item = &'a [u32]>,
{
    let batch_size = rows.len();
    let flat: Vec<u32> = rows.flat_map(|row| row.iter().copied()).collect();
    Ok(Tensor::from_vec(flat, (batch_size, seq_len), device)?)
}

fn stack_optional<F>(
    examples: &[EncodedExample],
    field: F,
    seq_len: usize,
    device: &Device,
) -> Result<Option<Tensor>>
where
    F: Fn(&EncodedExample) -> Option<&[u32]>,
{
    let present = examples.iter().filter(|e| field(e).is_some()).count();
    if present == 0 {
        return Ok(None);
    }
    if present != examples.len() {
        return Err(TagpieceError::Validation(format!(
            "only {present} of {} examples carry an optional stream",
            examples.len()
        )));
    }
    let rows = examples.iter().filter_map(|e| field(e));
    let flat: Vec<u32> = rows.flat_map(|row| row.iter().copied()).collect();
    Ok(Some(Tensor::from_vec(flat, (examples.len(), seq_len), device)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(ids: &[u32], target: Option<&[u32]>) -> EncodedExample {
        EncodedExample {
            input_ids: ids.to_vec(),
            attention_mask: ids.iter().map(|&id| u32::from(id != 0)).collect(),
            subtoken_check: None,
            target: target.map(<[u32]>::to_vec),
        }
    }

    #[test]
    fn test_collate_shapes() {
        let examples = vec![
            example(&[2, 7, 3, 0], Some(&[2, 4, 3, 0])),
            example(&[2, 8, 9, 3], Some(&[2, 4, 5, 3])),
        ];
        let batch = Batch::collate(&examples, &Device::Cpu).unwrap();

        assert_eq!(batch.size(), 2);
        assert_eq!(batch.seq_len(), 4);
        assert_eq!(
            batch.input_ids.to_vec2::<u32>().unwrap(),
            vec![vec![2, 7, 3, 0], vec![2, 8, 9, 3]]
        );
        assert_eq!(
            batch.attention_mask.to_vec2::<u32>().unwrap(),
            vec![vec![1, 1, 1, 0], vec![1, 1, 1, 1]]
        );
        assert!(batch.subtoken_check.is_none());
        assert_eq!(
            batch.target.unwrap().to_vec2::<u32>().unwrap()[1],
            vec![2, 4, 5, 3]
        );
    }

    #[test]
    fn test_collate_rejects_ragged_batch() {
        let examples = vec![example(&[2, 3, 0], None), example(&[2, 3], None)];
        assert!(matches!(
            Batch::collate(&examples, &Device::Cpu),
            Err(TagpieceError::ShapeMismatch {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn test_collate_rejects_partial_targets() {
        let examples = vec![example(&[2, 3], Some(&[1, 1])), example(&[2, 3], None)];
        assert!(matches!(
            Batch::collate(&examples, &Device::Cpu),
            Err(TagpieceError::Validation(_))
        ));
    }

    #[test]
    fn test_collate_empty() {
        assert!(Batch::collate(&[], &Device::Cpu).is_err());
    }
}
