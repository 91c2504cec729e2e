//! `interpose demo`: call the demo contract through an intercepted proxy.

use std::sync::Arc;

use interpose_engine::{EngineOptions, Hook, ProxyGenerator};

use crate::demo::{self, ConsoleInterceptor, MyClass, Scenario};
use crate::output::StyledOutput;

pub fn execute(
    options: EngineOptions,
    int: bool,
    fail_before: bool,
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let generator = ProxyGenerator::new(options);
    let scenario = if int { Scenario::Integer } else { Scenario::Text };
    let interceptor = if fail_before {
        ConsoleInterceptor::rejecting()
    } else {
        ConsoleInterceptor::new()
    };
    let target = Arc::new(MyClass::new());

    out.info(&format!("Scenario: {:?}", scenario));
    match demo::run(&generator, scenario, Arc::clone(&target), Arc::new(interceptor)) {
        Ok(result) => {
            out.success(&result);
            Ok(())
        }
        Err(err) if fail_before && err.is_hook_failure(Hook::Before) => {
            out.warning(&format!("Call aborted: {}", err));
            out.plain(&format!("Target calls: {}", target.calls()));
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
