/// Content-script DOM driver for the long-press save button and toasts

use crate::content::{BUTTON_LABEL, Command, LinkTarget, PressController, SAVING_LABEL, Viewport};
use crate::messages::{Message, Outcome, ToastMessage};
use crate::platform::{listen_for_messages, send_message};
use crate::toast::{TOAST_DURATION_MS, TOAST_FADE_MS, ToastController};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{AddEventListenerOptions, Document, Element, Event, HtmlAnchorElement, HtmlElement, MouseEvent, TouchEvent, Window};

const BUTTON_MARKER: &str = "save-button";

const SAVE_BUTTON_STYLES: &str = "
  .quicklinks-save-btn {
    position: fixed;
    padding: 10px 18px;
    background: linear-gradient(135deg, #6366f1, #8b5cf6);
    color: white;
    border: none;
    border-radius: 24px;
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    font-size: 14px;
    font-weight: 600;
    cursor: pointer;
    z-index: 2147483646;
    box-shadow: 0 4px 16px rgba(99, 102, 241, 0.4);
    transform: scale(0.9);
    opacity: 0;
    transition: transform 0.2s ease, opacity 0.2s ease;
    user-select: none;
  }
  .quicklinks-save-btn.visible { transform: scale(1); opacity: 1; }
  .quicklinks-save-btn.saving { pointer-events: none; opacity: 0.7; }

  .quicklinks-toast {
    position: fixed;
    bottom: 24px;
    right: 24px;
    padding: 12px 20px;
    border-radius: 8px;
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    font-size: 14px;
    font-weight: 500;
    color: white;
    z-index: 2147483647;
    opacity: 0;
    transform: translateY(20px);
    transition: opacity 0.3s ease, transform 0.3s ease;
    pointer-events: none;
  }
  .quicklinks-toast.visible { opacity: 1; transform: translateY(0); }
  .quicklinks-toast.success { background: linear-gradient(135deg, #10b981, #059669); }
  .quicklinks-toast.error { background: linear-gradient(135deg, #ef4444, #dc2626); }
  .quicklinks-toast.info { background: linear-gradient(135deg, #3b82f6, #2563eb); }
";

struct Page {
    window: Window,
    document: Document,
    controller: RefCell<PressController>,
    toasts: RefCell<ToastController>,
    button: RefCell<Option<HtmlElement>>,
    toast: RefCell<Option<HtmlElement>>,
    press_timer: Cell<Option<i32>>,
    dismiss_timer: Cell<Option<i32>>,
    styles_injected: Cell<bool>,
}

/// Content script entry point
pub fn install() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;

    let page = Rc::new(Page {
        controller: RefCell::new(PressController::new(viewport(&window))),
        toasts: RefCell::new(ToastController::new()),
        button: RefCell::new(None),
        toast: RefCell::new(None),
        press_timer: Cell::new(None),
        dismiss_timer: Cell::new(None),
        styles_injected: Cell::new(false),
        window,
        document,
    });

    page.listen("touchstart", true, |page, event| {
        let Some(touch) = event.dyn_ref::<TouchEvent>().and_then(|e| e.touches().get(0)) else {
            return Vec::new();
        };
        let link = find_link(event);
        page.pointer_down(touch.client_x() as f64, touch.client_y() as f64, link)
    })?;
    page.listen("mousedown", false, |page, event| {
        let Some(mouse) = event.dyn_ref::<MouseEvent>().filter(|e| e.button() == 0) else {
            return Vec::new();
        };
        page.pointer_down(mouse.client_x() as f64, mouse.client_y() as f64, find_link(event))
    })?;
    for name in ["touchend", "touchmove", "touchcancel"] {
        page.listen(name, true, |page, _| page.controller.borrow_mut().pointer_released())?;
    }
    for name in ["mouseup", "mousemove"] {
        page.listen(name, false, |page, _| page.controller.borrow_mut().pointer_released())?;
    }
    page.listen("click", false, |page, event| {
        let on_button = event
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .and_then(|el| el.get_attribute("data-quicklinks"))
            .is_some_and(|marker| marker == BUTTON_MARKER);
        page.controller.borrow_mut().document_click(on_button)
    })?;

    let toast_page = page.clone();
    listen_for_messages(move |message| {
        if let Message::Toast(toast) = message {
            toast_page.show_toast(toast);
        }
        None
    });

    log::info!("Content script loaded");
    Ok(())
}

fn viewport(window: &Window) -> Viewport {
    let dimension = |value: Result<JsValue, JsValue>| value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    Viewport {
        width: dimension(window.inner_width()),
        height: dimension(window.inner_height()),
    }
}

fn find_link(event: &Event) -> Option<LinkTarget> {
    let element = event.target()?.dyn_into::<Element>().ok()?;
    let anchor = element.closest("a[href]").ok()??.dyn_into::<HtmlAnchorElement>().ok()?;
    LinkTarget::new(&anchor.href(), &anchor.text_content().unwrap_or_default())
}

impl Page {
    fn listen<F>(self: &Rc<Self>, name: &str, passive: bool, handler: F) -> Result<(), JsValue>
    where
        F: Fn(&Rc<Page>, &Event) -> Vec<Command> + 'static,
    {
        let page = self.clone();
        let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let commands = handler(&page, &event);
            page.apply(commands);
        });

        let options = AddEventListenerOptions::new();
        options.set_passive(passive);
        self.document.add_event_listener_with_callback_and_add_event_listener_options(
            name,
            closure.as_ref().unchecked_ref(),
            &options,
        )?;
        closure.forget();
        Ok(())
    }

    fn pointer_down(&self, x: f64, y: f64, link: Option<LinkTarget>) -> Vec<Command> {
        let mut controller = self.controller.borrow_mut();
        controller.set_viewport(viewport(&self.window));
        controller.pointer_down(x, y, link)
    }

    fn after(&self, delay_ms: u32, callback: impl FnOnce() + 'static) -> Option<i32> {
        let callback = Closure::once_into_js(callback);
        self.window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay_ms as i32)
            .ok()
    }

    fn apply(self: &Rc<Self>, commands: Vec<Command>) {
        for command in commands {
            if let Err(e) = self.apply_one(command) {
                log::warn!("DOM update failed: {:?}", e);
            }
        }
    }

    fn apply_one(self: &Rc<Self>, command: Command) -> Result<(), JsValue> {
        match command {
            Command::ArmPressTimer { ticket, delay_ms } => {
                let page = self.clone();
                let handle = self.after(delay_ms, move || {
                    page.press_timer.set(None);
                    let commands = page.controller.borrow_mut().press_timer_fired(ticket);
                    page.apply(commands);
                });
                self.press_timer.set(handle);
            }
            Command::CancelPressTimer { .. } => {
                if let Some(handle) = self.press_timer.take() {
                    self.window.clear_timeout_with_handle(handle);
                }
            }
            Command::ShowButton { position } => {
                self.inject_styles()?;
                self.remove_button();

                let button = self.create("button")?;
                button.set_class_name("quicklinks-save-btn");
                button.set_text_content(Some(BUTTON_LABEL));
                button.set_attribute("data-quicklinks", BUTTON_MARKER)?;
                button.style().set_property("left", &format!("{}px", position.left))?;
                button.style().set_property("top", &format!("{}px", position.top))?;

                let page = self.clone();
                let on_click = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
                    event.prevent_default();
                    event.stop_propagation();
                    let href = page.window.location().href().unwrap_or_default();
                    let commands = page.controller.borrow_mut().activate(&href);
                    page.apply(commands);
                });
                button.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())?;
                on_click.forget();

                self.body()?.append_child(&button)?;
                self.reveal(&button);
                *self.button.borrow_mut() = Some(button);
            }
            Command::ArmDismissTimer { ticket, delay_ms } => {
                let page = self.clone();
                let handle = self.after(delay_ms, move || {
                    page.dismiss_timer.set(None);
                    let commands = page.controller.borrow_mut().dismiss_timer_fired(ticket);
                    page.apply(commands);
                });
                self.dismiss_timer.set(handle);
            }
            Command::CancelDismissTimer { .. } => {
                if let Some(handle) = self.dismiss_timer.take() {
                    self.window.clear_timeout_with_handle(handle);
                }
            }
            Command::MarkSaving => {
                if let Some(button) = self.button.borrow().as_ref() {
                    button.class_list().add_1("saving")?;
                    button.set_text_content(Some(SAVING_LABEL));
                }
            }
            Command::RemoveButton => self.remove_button(),
            Command::SendSaveLink(request) => {
                let page = self.clone();
                spawn_local(async move {
                    let result = send_message::<Outcome>(&Message::SaveLink(request)).await;
                    let commands = page.controller.borrow_mut().save_finished(result);
                    page.apply(commands);
                });
            }
            Command::ShowToast(toast) => self.show_toast(toast),
        }
        Ok(())
    }

    fn show_toast(self: &Rc<Self>, toast: ToastMessage) {
        if let Err(e) = self.try_show_toast(toast) {
            log::warn!("Failed to show toast: {:?}", e);
        }
    }

    fn try_show_toast(self: &Rc<Self>, toast: ToastMessage) -> Result<(), JsValue> {
        self.inject_styles()?;

        let (ticket, replaced) = self.toasts.borrow_mut().show();
        if replaced.is_some() {
            if let Some(previous) = self.toast.borrow_mut().take() {
                previous.remove();
            }
        }

        let element = self.create("div")?;
        element.set_class_name(&format!("quicklinks-toast {}", toast.toast_type.class_name()));
        element.set_text_content(Some(&toast.message));
        self.body()?.append_child(&element)?;
        self.reveal(&element);
        *self.toast.borrow_mut() = Some(element.clone());

        let page = self.clone();
        self.after(TOAST_DURATION_MS, move || {
            let _ = element.class_list().remove_1("visible");
            let fade_page = page.clone();
            page.after(TOAST_FADE_MS, move || {
                element.remove();
                if fade_page.toasts.borrow_mut().finish(ticket) {
                    fade_page.toast.borrow_mut().take();
                }
            });
        });
        Ok(())
    }

    fn remove_button(&self) {
        if let Some(button) = self.button.borrow_mut().take() {
            button.remove();
        }
    }

    fn create(&self, tag: &str) -> Result<HtmlElement, JsValue> {
        self.document.create_element(tag)?.dyn_into::<HtmlElement>().map_err(JsValue::from)
    }

    fn body(&self) -> Result<HtmlElement, JsValue> {
        self.document.body().ok_or_else(|| JsValue::from_str("no body"))
    }

    /// Add `visible` on the next frame so the CSS transition runs
    fn reveal(&self, element: &HtmlElement) {
        let element = element.clone();
        let callback = Closure::once_into_js(move || {
            let _ = element.class_list().add_1("visible");
        });
        let _ = self.window.request_animation_frame(callback.unchecked_ref());
    }

    fn inject_styles(&self) -> Result<(), JsValue> {
        if self.styles_injected.get() {
            return Ok(());
        }
        let style = self.document.create_element("style")?;
        style.set_text_content(Some(SAVE_BUTTON_STYLES));
        if let Some(head) = self.document.head() {
            head.append_child(&style)?;
        }
        self.styles_injected.set(true);
        Ok(())
    }
}
