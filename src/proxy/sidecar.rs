//! The hook runtime emitted once per package in instrumented mode.

use crate::config::GeneratorConfig;

const HANDLER_BOX: &str = "__handlerBox";
const HANDLER_SLOT: &str = "__handlerSlot";

/// Identifiers the sidecar declares at package level.
pub fn reserved_identifiers(config: &GeneratorConfig) -> Vec<String> {
    vec![
        config.hook_function.clone(),
        config.counter_var.clone(),
        config.handler_type.clone(),
        config.handler_setter.clone(),
        HANDLER_BOX.to_string(),
        HANDLER_SLOT.to_string(),
    ]
}

/// Go source of the hook runtime for `package`.
pub fn render_sidecar(config: &GeneratorConfig, package: &str) -> String {
    let GeneratorConfig {
        tool_identity,
        hook_function: hook,
        counter_var: counter,
        handler_type: handler,
        handler_setter: setter,
        ..
    } = config;

    format!(
        r#"// Code generated by {tool_identity}. DO NOT EDIT.

package {package}

import "sync/atomic"

// {handler} observes every proxied call. It receives the function name and
// the call id and returns the (possibly replaced) name and id.
type {handler} func(funcName string, callId int64) (string, int64)

type {handler_box} struct {{
	fn {handler}
}}

var {handler_slot} atomic.Value

var {counter} int64

// {setter} installs h as the process-wide handler. Passing nil removes it.
// It is safe to call while proxied functions run concurrently.
func {setter}(h {handler}) {{
	{handler_slot}.Store({handler_box}{{fn: h}})
}}

func {hook}(funcName string, callId int64) (string, int64) {{
	if callId == -1 {{
		callId = atomic.AddInt64(&{counter}, 1)
	}}
	box, _ := {handler_slot}.Load().({handler_box})
	if box.fn == nil {{
		return funcName, callId
	}}
	return box.fn(funcName, callId)
}}
"#,
        handler_box = HANDLER_BOX,
        handler_slot = HANDLER_SLOT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_declares_every_reserved_identifier() {
        let config = GeneratorConfig::default();
        let source = render_sidecar(&config, "shapes");

        assert!(source.starts_with("// Code generated by gen-proxy. DO NOT EDIT.\n"));
        assert!(source.contains("package shapes\n"));
        assert!(source.contains("callId = atomic.AddInt64(&__callId, 1)"));
        assert!(source.contains(
            "type ProxyInvocationHandler func(funcName string, callId int64) (string, int64)"
        ));
        for name in reserved_identifiers(&config) {
            assert!(source.contains(&name), "{} missing from sidecar", name);
        }
    }

    #[test]
    fn test_sidecar_uses_configured_names() {
        let config = GeneratorConfig {
            hook_function: "traceCall".to_string(),
            handler_setter: "SetTracer".to_string(),
            ..GeneratorConfig::default()
        };
        let source = render_sidecar(&config, "geom");
        assert!(source.contains("func traceCall(funcName string, callId int64) (string, int64) {"));
        assert!(source.contains("func SetTracer(h ProxyInvocationHandler) {"));
    }
}
