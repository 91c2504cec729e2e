//! `interpose describe`: print the demo contracts' descriptors.

use interpose_engine::ProxyGenerator;

use crate::demo::{MyIntInterface, MyInterface};
use crate::output::StyledOutput;

pub fn execute(out: &mut StyledOutput) -> anyhow::Result<()> {
    let generator = ProxyGenerator::global();
    out.descriptor(&generator.describe::<dyn MyInterface>()?);
    out.descriptor(&generator.describe::<dyn MyIntInterface>()?);
    Ok(())
}
