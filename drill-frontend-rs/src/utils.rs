use wasm_bindgen::JsValue;

pub fn set_panic_hook() {
    // Panics show up in the browser console with a stack trace instead of "unreachable".
    // https://github.com/rustwasm/console_error_panic_hook#readme
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

pub(crate) fn to_js_error(e: impl std::fmt::Debug) -> JsValue {
    JsValue::from_str(&format!("{e:?}"))
}

/// Wraps a JS callback as a telemetry sink, or logs events when there is none.
pub(crate) fn telemetry_sink(
    callback: Option<js_sys::Function>,
) -> std::rc::Rc<dyn crate::telemetry::TelemetrySink> {
    match callback {
        Some(callback) => std::rc::Rc::new(crate::telemetry::JsSink::new(callback)),
        None => std::rc::Rc::new(crate::telemetry::LogSink),
    }
}
