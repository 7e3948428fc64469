/// Reusable UI components for the options page

use crate::session::AuthState;
use yew::prelude::*;

const USER_ID_PREVIEW: usize = 16;

#[derive(Properties, PartialEq)]
pub struct AuthStatusProps {
    /// `None` while the state is loading
    pub state: Option<AuthState>,
}

#[function_component(AuthStatus)]
pub fn auth_status(props: &AuthStatusProps) -> Html {
    let Some(state) = &props.state else {
        return html! {
            <div class="auth-status">
                <p class="auth-subtitle">{"Checking login status..."}</p>
            </div>
        };
    };

    let (icon, icon_class, title, subtitle) = if state.is_authenticated {
        let user: String = state
            .user_id
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(USER_ID_PREVIEW)
            .collect();
        ("✅", "auth-status-icon logged-in", "Logged in", format!("User ID: {}...", user))
    } else {
        (
            "❌",
            "auth-status-icon logged-out",
            "Not logged in",
            "Sign in on the QuickLinks dashboard to start saving links".to_string(),
        )
    };

    html! {
        <div class="auth-status">
            <div class={icon_class}>{icon}</div>
            <div>
                <strong class="auth-title">{title}</strong>
                <p class="auth-subtitle">{subtitle}</p>
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct SettingsFieldProps {
    pub id: AttrValue,
    pub label: AttrValue,
    pub value: String,
    pub oninput: Callback<InputEvent>,
    #[prop_or_default]
    pub placeholder: Option<AttrValue>,
}

#[function_component(SettingsField)]
pub fn settings_field(props: &SettingsFieldProps) -> Html {
    html! {
        <div class="settings-field">
            <label for={props.id.clone()} class="settings-label">{props.label.clone()}</label>
            <input
                id={props.id.clone()}
                type="url"
                class="settings-input"
                value={props.value.clone()}
                placeholder={props.placeholder.clone()}
                oninput={props.oninput.clone()}
            />
        </div>
    }
}
