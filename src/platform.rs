/// Chrome extension platform glue: storage, fetch, runtime messaging
use crate::api::{HttpResponse, HttpTransport, TransportError};
use crate::bridge::{self, BridgeEvent};
use crate::config::KeyValueStore;
use crate::error::{LinkError, LinkResult};
use crate::messages::{ContextMenuClick, Message, Outcome, TabRef};
use crate::router::{CONTEXT_MENU_ID, CONTEXT_MENU_TITLE, MessageRouter};
use crate::session::SystemClock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

// Import JS bridge functions
#[wasm_bindgen(module = "/extension.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn storageSyncGet(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn storageSyncSet(values: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn storageSyncRemove(keys: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn postJson(url: &str, bearer: &str, body: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn sendRuntimeMessage(message: JsValue) -> Result<JsValue, JsValue>;

    fn sendTabMessage(tab_id: i32, message: JsValue);

    fn onRuntimeMessage(handler: &js_sys::Function);

    fn ensureContextMenu(id: &str, title: &str);

    fn onContextMenuClicked(handler: &js_sys::Function);
}

/// Plain-object conversion; maps would otherwise become JS `Map`s
pub fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn from_js(value: JsValue) -> Value {
    if value.is_null() || value.is_undefined() {
        return Value::Null;
    }
    serde_wasm_bindgen::from_value(value).unwrap_or(Value::Null)
}

/// chrome.storage.sync
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeSyncStorage;

impl KeyValueStore for ChromeSyncStorage {
    async fn get(&self, keys: &[&str]) -> LinkResult<Map<String, Value>> {
        let keys_js = to_js(&keys).map_err(|e| LinkError::Storage(format!("{:?}", e)))?;
        let stored = storageSyncGet(keys_js)
            .await
            .map_err(|e| LinkError::Storage(format!("Failed to get storage: {:?}", e)))?;

        match from_js(stored) {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    async fn set(&self, values: Map<String, Value>) -> LinkResult<()> {
        let values_js = to_js(&values).map_err(|e| LinkError::Storage(format!("{:?}", e)))?;
        storageSyncSet(values_js)
            .await
            .map_err(|e| LinkError::Storage(format!("Failed to save storage: {:?}", e)))
    }

    async fn remove(&self, keys: &[&str]) -> LinkResult<()> {
        let keys_js = to_js(&keys).map_err(|e| LinkError::Storage(format!("{:?}", e)))?;
        storageSyncRemove(keys_js)
            .await
            .map_err(|e| LinkError::Storage(format!("Failed to remove from storage: {:?}", e)))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchResult {
    status: u16,
    #[serde(default)]
    status_text: String,
    #[serde(default)]
    body: String,
}

/// `fetch` through the JS bridge
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchTransport;

impl HttpTransport for FetchTransport {
    async fn post_json(&self, url: &str, bearer: &str, body: String) -> Result<HttpResponse, TransportError> {
        let result = postJson(url, bearer, &body)
            .await
            .map_err(|e| TransportError(format!("{:?}", e)))?;

        let result: FetchResult = serde_wasm_bindgen::from_value(result)
            .map_err(|e| TransportError(format!("Failed to parse fetch result: {:?}", e)))?;

        Ok(HttpResponse {
            status: result.status,
            status_text: result.status_text,
            body: result.body,
        })
    }
}

/// Send a message to the background and parse its single reply
pub async fn send_message<T: for<'de> Deserialize<'de>>(message: &Message) -> Result<T, String> {
    let message_js = to_js(message).map_err(|e| format!("Failed to serialize: {:?}", e))?;
    let reply = sendRuntimeMessage(message_js)
        .await
        .map_err(|e| format!("Failed to send message: {:?}", e))?;
    serde_json::from_value(from_js(reply)).map_err(|e| format!("Failed to parse reply: {}", e))
}

/// Register a runtime message listener. The handler returns `None` for messages
/// it does not answer; otherwise its future resolves the one reply.
pub fn listen_for_messages<F>(mut handler: F)
where
    F: FnMut(Message) -> Option<js_sys::Promise> + 'static,
{
    let closure = Closure::<dyn FnMut(JsValue) -> JsValue>::new(move |raw: JsValue| {
        match Message::from_value(from_js(raw)) {
            Some(message) => handler(message).map(JsValue::from).unwrap_or(JsValue::UNDEFINED),
            None => JsValue::UNDEFINED,
        }
    });
    onRuntimeMessage(closure.as_ref().unchecked_ref());
    closure.forget();
}

type BackgroundRouter = MessageRouter<ChromeSyncStorage, SystemClock, FetchTransport>;

/// Service worker entry: context menu plus the message router
pub fn install_background() {
    let router: Rc<BackgroundRouter> = Rc::new(MessageRouter::new(ChromeSyncStorage, SystemClock, FetchTransport));

    ensureContextMenu(CONTEXT_MENU_ID, CONTEXT_MENU_TITLE);

    {
        let router = router.clone();
        listen_for_messages(move |message| {
            if !BackgroundRouter::answers(&message) {
                return None;
            }
            let router = router.clone();
            Some(future_to_promise(async move {
                match router.route(message).await {
                    Some(reply) => to_js(&reply),
                    None => to_js(&Outcome::failed("Unhandled message")),
                }
            }))
        });
    }

    let on_click = Closure::<dyn FnMut(JsValue, JsValue)>::new(move |info: JsValue, tab: JsValue| {
        let router = router.clone();
        let click = serde_json::from_value::<ContextMenuClick>(from_js(info));
        let tab = serde_json::from_value::<TabRef>(from_js(tab)).ok();

        let Ok(click) = click else {
            log::warn!("Unreadable context menu click");
            return;
        };

        spawn_local(async move {
            let tab_id = tab.as_ref().and_then(|t| t.id);
            let Some(toast) = router.context_menu_clicked(click, tab).await else {
                return;
            };
            let Some(tab_id) = tab_id else {
                return;
            };
            match to_js(&Message::Toast(toast)) {
                Ok(message) => sendTabMessage(tab_id, message),
                Err(e) => log::warn!("Failed to send toast: {:?}", e),
            }
        });
    });
    onContextMenuClicked(on_click.as_ref().unchecked_ref());
    on_click.forget();

    log::info!("Background router installed");
}

/// Dashboard page entry: relay the auth `postMessage` into the extension
pub fn install_web_auth_bridge() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;

    let listener_window = window.clone();
    let on_message = Closure::<dyn FnMut(web_sys::MessageEvent)>::new(move |event: web_sys::MessageEvent| {
        let from_same_window = event
            .source()
            .map(|source| js_sys::Object::is(&source, &listener_window))
            .unwrap_or(false);
        let page_origin = listener_window.location().origin().unwrap_or_default();
        let origin = event.origin();
        let data = from_js(event.data());

        let accepted = bridge::accept(&BridgeEvent {
            from_same_window,
            origin: &origin,
            page_origin: &page_origin,
            data: &data,
        });

        if let Some(message) = accepted {
            spawn_local(async move {
                if let Err(e) = send_message::<Outcome>(&message).await {
                    log::debug!("Auth relay failed: {}", e);
                }
            });
        }
    });

    window.add_event_listener_with_callback("message", on_message.as_ref().unchecked_ref())?;
    on_message.forget();
    Ok(())
}
