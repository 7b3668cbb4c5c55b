//! Login, logout, registration, and profile editing.

use axum::{
    extract::{Form, Path, Query, State},
    http::{HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::{
    application::accounts::{AccountError, ProfileUpdate},
    domain::entities::SessionRecord,
    presentation::views::{
        LayoutContext, LoginContext, LoginTemplate, PageShell, ProfileFormContext,
        ProfileFormTemplate, RegistrationContext, RegistrationTemplate, profile_path,
        render_csrf_failure_response, render_not_found_response, render_server_error_response,
        render_template_response,
    },
};

use super::HttpState;
use super::extract::{CsrfToken, CurrentUser, MaybeUser, SESSION_COOKIE, safe_next_target};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NextQuery {
    pub next: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: String,
    #[serde(default)]
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
    #[serde(default)]
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutForm {
    #[serde(default)]
    pub csrf_token: String,
}

fn session_cookie_header(session: &SessionRecord, max_age_seconds: i64) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}",
        session.token
    ))
    .ok()
}

fn clear_session_cookie_header() -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0")).ok()
}

pub async fn login_form(
    MaybeUser(user): MaybeUser,
    CsrfToken(csrf): CsrfToken,
    Query(query): Query<NextQuery>,
) -> Response {
    if let Some(user) = &user {
        return Redirect::to(&profile_path(&user.username)).into_response();
    }

    let shell = PageShell::new(None, csrf);
    let content = LoginContext {
        next_value: query.next,
        username_value: String::new(),
        error: String::new(),
        has_error: false,
    };
    render_template_response(
        LoginTemplate {
            view: LayoutContext::new(shell, content),
        },
        StatusCode::OK,
    )
}

pub async fn login(
    State(state): State<HttpState>,
    csrf: CsrfToken,
    Form(form): Form<LoginForm>,
) -> Response {
    let shell = PageShell::new(None, csrf.0.clone());
    if !csrf.matches(&form.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    match state.accounts.login(&form.username, &form.password).await {
        Ok((user, session)) => {
            let target = safe_next_target(&form.next)
                .map(str::to_string)
                .unwrap_or_else(|| profile_path(&user.username));
            let max_age = (session.expires_at - session.created_at).whole_seconds();

            let mut response = Redirect::to(&target).into_response();
            if let Some(cookie) = session_cookie_header(&session, max_age) {
                response.headers_mut().append(SET_COOKIE, cookie);
            }
            response
        }
        Err(AccountError::InvalidCredentials) | Err(AccountError::Validation(_)) => {
            let content = LoginContext {
                next_value: form.next,
                username_value: form.username,
                error: "Invalid username or password.".to_string(),
                has_error: true,
            };
            render_template_response(
                LoginTemplate {
                    view: LayoutContext::new(shell, content),
                },
                StatusCode::OK,
            )
        }
        Err(err) => render_server_error_response(shell, err.to_string()),
    }
}

pub async fn logout(
    State(state): State<HttpState>,
    MaybeUser(user): MaybeUser,
    csrf: CsrfToken,
    headers: axum::http::HeaderMap,
    Form(form): Form<LogoutForm>,
) -> Response {
    let shell = PageShell::new(user.as_ref(), csrf.0.clone());
    if !csrf.matches(&form.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    if let Some(token) = super::extract::cookie_value(&headers, SESSION_COOKIE)
        && let Err(err) = state.accounts.logout(&token).await
    {
        return render_server_error_response(shell, err.to_string());
    }

    let mut response = Redirect::to("/").into_response();
    if let Some(cookie) = clear_session_cookie_header() {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

pub async fn registration_form(
    MaybeUser(user): MaybeUser,
    CsrfToken(csrf): CsrfToken,
) -> Response {
    if let Some(user) = &user {
        return Redirect::to(&profile_path(&user.username)).into_response();
    }

    let shell = PageShell::new(None, csrf);
    let content = RegistrationContext {
        username_value: String::new(),
        error: String::new(),
        has_error: false,
    };
    render_template_response(
        RegistrationTemplate {
            view: LayoutContext::new(shell, content),
        },
        StatusCode::OK,
    )
}

pub async fn register(
    State(state): State<HttpState>,
    csrf: CsrfToken,
    Form(form): Form<RegistrationForm>,
) -> Response {
    let shell = PageShell::new(None, csrf.0.clone());
    if !csrf.matches(&form.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    match state
        .accounts
        .register(&form.username, &form.password1, &form.password2)
        .await
    {
        Ok(_) => Redirect::to("/auth/login/").into_response(),
        Err(AccountError::UsernameTaken) => registration_error(shell, form, "That username is already taken."),
        Err(AccountError::Validation(message)) => registration_error(shell, form, &message),
        Err(err) => render_server_error_response(shell, err.to_string()),
    }
}

fn registration_error(shell: PageShell, form: RegistrationForm, message: &str) -> Response {
    let content = RegistrationContext {
        username_value: form.username,
        error: message.to_string(),
        has_error: true,
    };
    render_template_response(
        RegistrationTemplate {
            view: LayoutContext::new(shell, content),
        },
        StatusCode::OK,
    )
}

pub async fn profile_edit_form(
    CurrentUser(user): CurrentUser,
    CsrfToken(csrf): CsrfToken,
    Path(username): Path<String>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf);

    if username != user.username {
        return render_not_found_response(shell);
    }

    render_template_response(
        ProfileFormTemplate {
            view: LayoutContext::new(shell, ProfileFormContext::for_user(&user)),
        },
        StatusCode::OK,
    )
}

pub async fn profile_update(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    csrf: CsrfToken,
    Path(username): Path<String>,
    Form(form): Form<ProfileForm>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf.0.clone());

    if username != user.username {
        return render_not_found_response(shell);
    }
    if !csrf.matches(&form.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    let update = ProfileUpdate {
        username: form.username.clone(),
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        email: form.email.clone(),
    };

    match state.accounts.update_profile(&user, update).await {
        Ok(updated) => Redirect::to(&profile_path(&updated.username)).into_response(),
        Err(AccountError::UsernameTaken) => {
            profile_error(shell, &user, form, "That username is already taken.")
        }
        Err(AccountError::Validation(message)) => profile_error(shell, &user, form, &message),
        Err(err) => render_server_error_response(shell, err.to_string()),
    }
}

fn profile_error(
    shell: PageShell,
    user: &crate::domain::entities::UserRecord,
    form: ProfileForm,
    message: &str,
) -> Response {
    let mut content = ProfileFormContext::for_user(user).with_error(message);
    content.username_value = form.username;
    content.first_name_value = form.first_name;
    content.last_name_value = form.last_name;
    content.email_value = form.email;
    render_template_response(
        ProfileFormTemplate {
            view: LayoutContext::new(shell, content),
        },
        StatusCode::OK,
    )
}
