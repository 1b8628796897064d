//! Crate-level test doubles and behavioural tests.

use mockall::mock;
use serde_json::json;
use shim_config::Backend;
use shim_engine::error::ShimError;
use shim_engine::exec::{CommandRunner, Executor, Invocation};
use shim_engine::{MappingTable, Router};

use crate::context::ModuleContext;
use crate::info::ModuleInfo;


mock! {
    pub Runner {}
    impl CommandRunner for Runner {
        fn run(&self, command: &str) -> Result<String, ShimError>;
    }
}

/// Executor answering every invocation through a closure.
pub struct FnExecutor<F>(pub F);

impl<F> std::fmt::Debug for FnExecutor<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnExecutor")
    }
}

impl<F> Executor for FnExecutor<F>
where
    F: Fn(&Invocation<'_>) -> Result<String, ShimError>,
{
    fn execute(&self, invocation: &Invocation<'_>) -> Result<String, ShimError> {
        (self.0)(invocation)
    }
}

/// Boxed tool behaviour so scenarios can swap it at runtime.
pub type ToolFn = Box<dyn Fn(&Invocation<'_>) -> Result<String, ShimError>>;

/// Context type used by tests.
pub type TestContext = ModuleContext<FnExecutor<ToolFn>>;

/// Builds an enabled context over the built-in table for `backend`.
pub fn enabled_context(backend: Backend, tool: ToolFn) -> TestContext {
    let table = MappingTable::builtin(backend);
    let info = ModuleInfo::for_table(backend, &table);
    let context = ModuleContext::new(info, Router::new(table, FnExecutor(tool)));
    context.set_enabled(true);
    context
}

/// `service_facts` output with two running systemd services.
pub fn service_facts() -> String {
    json!({"ansible_facts": {"services": {
        "nginx.service": {"name": "nginx", "source": "systemd", "state": "running"},
        "sshd.service": {"name": "sshd", "source": "systemd", "state": "running"},
        "cron": {"name": "cron", "source": "sysv", "state": "running"},
        "cups.service": {"name": "cups", "source": "systemd", "state": "stopped"}
    }}})
    .to_string()
}

/// Tool that answers every call with [`service_facts`].
pub fn facts_tool() -> ToolFn {
    Box::new(|_| Ok(service_facts()))
}

/// Tool that fails every call with a non-zero exit.
pub fn failing_tool() -> ToolFn {
    Box::new(|invocation| {
        Err(ShimError::NonZeroExit {
            command: invocation.target().qualified_module(),
            status: 2,
        })
    })
}
