use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
	#[wasm_bindgen(js_name = queueMicrotask)]
	fn queue_microtask(callback: &JsValue);
}

/// Run `func` once the current JS task yields.
pub(crate) fn queue(func: impl FnOnce() + 'static) {
	let callback = Closure::once_into_js(func);
	queue_microtask(&callback);
}
