/// Options page: API settings and login status

use crate::config::{Config, ConfigStore};
use crate::messages::{Message, Outcome};
use crate::platform::{ChromeSyncStorage, send_message};
use crate::session::AuthState;
use crate::ui::components::{AuthStatus, SettingsField};
use patternfly_yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

const STATUS_CLEAR_MS: i32 = 5000;

#[derive(Clone, PartialEq)]
enum PageState {
    Loading,
    Idle,
    Saving,
}

#[derive(Clone, PartialEq)]
enum Status {
    Success(String),
    Error(String),
}

#[function_component(OptionsPage)]
pub fn options_page() -> Html {
    let state = use_state(|| PageState::Loading);
    let api_base_url = use_state(String::new);
    let clerk_frontend_api_url = use_state(String::new);
    let auth = use_state(|| None::<AuthState>);
    let status = use_state(|| None::<Status>);
    let status_ticket = use_mut_ref(|| 0u32);

    // Load config and auth state on mount
    {
        let state = state.clone();
        let api_base_url = api_base_url.clone();
        let clerk_frontend_api_url = clerk_frontend_api_url.clone();
        let auth = auth.clone();
        let status = status.clone();

        use_effect_with((), move |_| {
            spawn_local(async move {
                match send_message::<Config>(&Message::GetConfig).await {
                    Ok(config) => {
                        api_base_url.set(config.api_base_url);
                        clerk_frontend_api_url.set(config.clerk_frontend_api_url);
                    }
                    Err(e) => status.set(Some(Status::Error(format!("Failed to load: {}", e)))),
                }
                refresh_auth(auth).await;
                state.set(PageState::Idle);
            });
            || ()
        });
    }

    // Show a status line, cleared after a few seconds unless replaced
    let show_status = {
        let status = status.clone();
        let status_ticket = status_ticket.clone();
        move |next: Status| {
            let ticket = {
                let mut current = status_ticket.borrow_mut();
                *current = current.wrapping_add(1);
                *current
            };
            status.set(Some(next));

            let status = status.clone();
            let status_ticket = status_ticket.clone();
            let clear = Closure::once_into_js(move || {
                if *status_ticket.borrow() == ticket {
                    status.set(None);
                }
            });
            if let Some(window) = web_sys::window() {
                let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(clear.unchecked_ref(), STATUS_CLEAR_MS);
            }
        }
    };

    let on_api_input = {
        let api_base_url = api_base_url.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                api_base_url.set(input.value());
            }
        })
    };

    let on_clerk_input = {
        let clerk_frontend_api_url = clerk_frontend_api_url.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                clerk_frontend_api_url.set(input.value());
            }
        })
    };

    let on_save = {
        let state = state.clone();
        let api_base_url = api_base_url.clone();
        let clerk_frontend_api_url = clerk_frontend_api_url.clone();
        let show_status = show_status.clone();

        Callback::from(move |_| {
            let state = state.clone();
            let api_base_url = api_base_url.clone();
            let clerk = (*clerk_frontend_api_url).clone();
            let show_status = show_status.clone();

            state.set(PageState::Saving);
            spawn_local(async move {
                let store = ConfigStore::new(ChromeSyncStorage);
                let result = store.save_settings(&api_base_url, &clerk).await;
                match result {
                    Ok(()) => {
                        if let Ok(config) = store.get().await {
                            api_base_url.set(config.api_base_url);
                        }
                        show_status(Status::Success("Settings saved successfully! ✨".to_string()));
                    }
                    Err(e) => show_status(Status::Error(format!("Failed to save: {}", e))),
                }
                state.set(PageState::Idle);
            });
        })
    };

    let on_logout = {
        let auth = auth.clone();
        let show_status = show_status.clone();

        Callback::from(move |_| {
            let auth = auth.clone();
            let show_status = show_status.clone();
            spawn_local(async move {
                match send_message::<Outcome>(&Message::Logout).await {
                    Ok(outcome) if outcome.success => show_status(Status::Success("Logged out".to_string())),
                    Ok(outcome) => show_status(Status::Error(outcome.error.unwrap_or_default())),
                    Err(e) => show_status(Status::Error(e)),
                }
                refresh_auth(auth).await;
            });
        })
    };

    let is_busy = !matches!(*state, PageState::Idle);
    let logged_in = (*auth).as_ref().is_some_and(|a| a.is_authenticated);

    html! {
        <div class="padding-20">
            <h1 class="options-title">{"QuickLinks Settings"}</h1>

            <AuthStatus state={(*auth).clone()} />
            if logged_in {
                <Button onclick={on_logout} disabled={is_busy} variant={ButtonVariant::Secondary}>
                    {"Log out"}
                </Button>
            }

            if *state == PageState::Loading {
                <div class="loading-text-center">
                    <Spinner />
                </div>
            } else {
                <div class="flex-column-gap">
                    <SettingsField
                        id="apiBaseUrl"
                        label="API base URL"
                        value={(*api_base_url).clone()}
                        oninput={on_api_input}
                        placeholder={Some(AttrValue::from(crate::config::DEFAULT_API_BASE_URL))}
                    />
                    <SettingsField
                        id="clerkFrontendApiUrl"
                        label="Clerk frontend API URL"
                        value={(*clerk_frontend_api_url).clone()}
                        oninput={on_clerk_input}
                    />
                    <Button onclick={on_save} disabled={is_busy} variant={ButtonVariant::Primary} block={true}>
                        {"Save settings"}
                    </Button>
                </div>
            }

            {match &*status {
                Some(Status::Success(msg)) => html! {
                    <Alert r#type={AlertType::Success} title={msg.clone()} inline={true}>
                    </Alert>
                },
                Some(Status::Error(msg)) => html! {
                    <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                        {msg.clone()}
                    </Alert>
                },
                None => html! {}
            }}
        </div>
    }
}

async fn refresh_auth(auth: UseStateHandle<Option<AuthState>>) {
    match send_message::<AuthState>(&Message::CheckAuth).await {
        Ok(state) => auth.set(Some(state)),
        Err(e) => {
            log::warn!("Failed to check auth: {}", e);
            auth.set(Some(AuthState::unauthenticated()));
        }
    }
}
