//! Multiset union of N same-coded batches.
//!
//! Output size is the sum of the input sizes; duplicates (including an input
//! listed twice) are kept. Element order across inputs is unspecified.

use runnel_core::coder::Coder;
use runnel_core::value::Batch;

use crate::traits::{OpError, Operator};

#[derive(Debug, Clone, Copy, Default)]
pub struct Union;

impl Operator for Union {
    fn name(&self) -> &'static str {
        "union"
    }

    fn eval(&self, inputs: &[&Batch], output_coder: &Coder) -> Result<Batch, OpError> {
        if let Some(bad) = inputs.iter().find(|b| b.coder != *output_coder) {
            return Err(OpError::Exec(format!(
                "union input coded {} does not match output {output_coder}",
                bad.coder
            )));
        }
        let total: usize = inputs.iter().map(|b| b.len()).sum();
        let mut values = Vec::with_capacity(total);
        for batch in inputs {
            values.extend(batch.values.iter().cloned());
        }
        Ok(Batch::new(output_coder.clone(), values))
    }
}
