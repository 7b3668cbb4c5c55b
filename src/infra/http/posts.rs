//! Post create/edit/delete handlers; authorship is enforced by the service
//! layer, these map its verdicts onto redirects and error pages.

use axum::{
    extract::{Form, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{
    application::{error::HttpError, posts::{PostActionError, PostDraft}},
    presentation::views::{
        ISO_DATE_FORMAT, LayoutContext, PageShell, PostCardView, PostDeleteContext,
        PostDeleteTemplate, PostFormContext, PostFormTemplate, post_path,
        profile_path, render_csrf_failure_response, render_not_found_response,
        render_server_error_response, render_template_response,
    },
};

use super::HttpState;
use super::extract::{CsrfToken, CurrentUser};
use super::public::parse_id;
use crate::domain::visibility::Viewer;

/// Fields of the multipart create/edit form.
struct PostFormData {
    title: String,
    text: String,
    pub_date_raw: String,
    csrf_token: String,
    image: Option<(String, Bytes)>,
}

async fn read_post_form(mut multipart: Multipart) -> Result<PostFormData, HttpError> {
    const SOURCE: &str = "infra::http::posts::read_post_form";

    let mut data = PostFormData {
        title: String::new(),
        text: String::new(),
        pub_date_raw: String::new(),
        csrf_token: String::new(),
        image: None,
    };

    loop {
        let field = multipart.next_field().await.map_err(|err| {
            HttpError::new(SOURCE, StatusCode::BAD_REQUEST, "Malformed form data", err.to_string())
        })?;
        let Some(field) = field else { break };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" | "text" | "pub_date" | "csrf_token" => {
                let value = field.text().await.map_err(|err| {
                    HttpError::new(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Malformed form data",
                        err.to_string(),
                    )
                })?;
                match name.as_str() {
                    "title" => data.title = value,
                    "text" => data.text = value,
                    "pub_date" => data.pub_date_raw = value,
                    _ => data.csrf_token = value,
                }
            }
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let payload = field.bytes().await.map_err(|err| {
                    HttpError::new(
                        SOURCE,
                        StatusCode::BAD_REQUEST,
                        "Malformed upload",
                        err.to_string(),
                    )
                })?;
                if !file_name.is_empty() && !payload.is_empty() {
                    data.image = Some((file_name, payload));
                }
            }
            _ => {}
        }
    }

    Ok(data)
}

/// `<input type="date">` value; blank means "publish now".
fn parse_pub_date(raw: &str) -> Result<OffsetDateTime, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(OffsetDateTime::now_utc());
    }

    Date::parse(trimmed, ISO_DATE_FORMAT)
        .map(|date| date.midnight().assume_utc())
        .map_err(|_| format!("`{trimmed}` is not a valid date"))
}

fn create_context(data: &PostFormData) -> PostFormContext {
    let mut context = PostFormContext::create();
    refill(&mut context, data);
    context
}

fn edit_context(id: uuid::Uuid, data: &PostFormData) -> PostFormContext {
    let mut context = PostFormContext::create();
    context.heading = "Edit post".to_string();
    context.action = format!("/posts/{id}/edit/");
    refill(&mut context, data);
    context
}

fn refill(context: &mut PostFormContext, data: &PostFormData) {
    context.title_value = data.title.clone();
    context.text_value = data.text.clone();
    context.pub_date_value = data.pub_date_raw.clone();
}

pub async fn create_form(
    CurrentUser(user): CurrentUser,
    CsrfToken(csrf): CsrfToken,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf);
    render_template_response(
        PostFormTemplate {
            view: LayoutContext::new(shell, PostFormContext::create()),
        },
        StatusCode::OK,
    )
}

pub async fn create(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    csrf: CsrfToken,
    multipart: Multipart,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf.0.clone());

    let data = match read_post_form(multipart).await {
        Ok(data) => data,
        Err(err) => return err.into_response(),
    };
    if !csrf.matches(&data.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    let pub_date = match parse_pub_date(&data.pub_date_raw) {
        Ok(value) => value,
        Err(message) => {
            let context = create_context(&data).with_error(message);
            return render_template_response(
                PostFormTemplate {
                    view: LayoutContext::new(shell, context),
                },
                StatusCode::OK,
            );
        }
    };

    let image_path = match store_image(&state, &shell, data.image.clone()).await {
        Ok(path) => path,
        Err(response) => return response,
    };

    let draft = PostDraft {
        title: data.title.clone(),
        text: data.text.clone(),
        pub_date,
        image_path,
    };

    match state.posts.create(&user, draft).await {
        Ok(_) => Redirect::to(&profile_path(&user.username)).into_response(),
        Err(PostActionError::Validation(message)) => {
            let context = create_context(&data).with_error(message);
            render_template_response(
                PostFormTemplate {
                    view: LayoutContext::new(shell, context),
                },
                StatusCode::OK,
            )
        }
        Err(err) => render_server_error_response(shell, err.to_string()),
    }
}

pub async fn edit_form(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    CsrfToken(csrf): CsrfToken,
    Path(id): Path<String>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf);
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(shell);
    };

    match state.posts.load_for_edit(id, Viewer::User(user.id)).await {
        Ok(post) => render_template_response(
            PostFormTemplate {
                view: LayoutContext::new(shell, PostFormContext::edit(&post)),
            },
            StatusCode::OK,
        ),
        Err(PostActionError::NotAuthor) => Redirect::to(&post_path(id)).into_response(),
        Err(PostActionError::NotFound) => render_not_found_response(shell),
        Err(err) => render_server_error_response(shell, err.to_string()),
    }
}

pub async fn update(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    csrf: CsrfToken,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf.0.clone());
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(shell);
    };

    let data = match read_post_form(multipart).await {
        Ok(data) => data,
        Err(err) => return err.into_response(),
    };
    if !csrf.matches(&data.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    let pub_date = match parse_pub_date(&data.pub_date_raw) {
        Ok(value) => value,
        Err(message) => {
            let context = edit_context(id, &data).with_error(message);
            return render_template_response(
                PostFormTemplate {
                    view: LayoutContext::new(shell, context),
                },
                StatusCode::OK,
            );
        }
    };

    let image_path = match store_image(&state, &shell, data.image.clone()).await {
        Ok(path) => path,
        Err(response) => return response,
    };

    let draft = PostDraft {
        title: data.title.clone(),
        text: data.text.clone(),
        pub_date,
        image_path,
    };

    match state.posts.update(id, Viewer::User(user.id), draft).await {
        Ok(_) => Redirect::to(&post_path(id)).into_response(),
        Err(PostActionError::NotAuthor) => Redirect::to(&post_path(id)).into_response(),
        Err(PostActionError::NotFound) => render_not_found_response(shell),
        Err(PostActionError::Validation(message)) => {
            let context = edit_context(id, &data).with_error(message);
            render_template_response(
                PostFormTemplate {
                    view: LayoutContext::new(shell, context),
                },
                StatusCode::OK,
            )
        }
        Err(err) => render_server_error_response(shell, err.to_string()),
    }
}

pub async fn delete_confirm(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    CsrfToken(csrf): CsrfToken,
    Path(id): Path<String>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf);
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(shell);
    };

    match state.posts.load_for_delete(id, Viewer::User(user.id)).await {
        Ok(post) => {
            let now = OffsetDateTime::now_utc();
            let content = PostDeleteContext {
                card: PostCardView::from_item(&post, now),
                action: format!("/posts/{id}/delete/"),
            };
            render_template_response(
                PostDeleteTemplate {
                    view: LayoutContext::new(shell, content),
                },
                StatusCode::OK,
            )
        }
        Err(PostActionError::NotAuthor) | Err(PostActionError::NotFound) => {
            render_not_found_response(shell)
        }
        Err(err) => render_server_error_response(shell, err.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfirmForm {
    #[serde(default)]
    pub csrf_token: String,
}

pub async fn delete(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    csrf: CsrfToken,
    Path(id): Path<String>,
    Form(form): Form<ConfirmForm>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf.0.clone());
    let Some(id) = parse_id(&id) else {
        return render_not_found_response(shell);
    };

    if !csrf.matches(&form.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    match state.posts.delete(id, Viewer::User(user.id)).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(PostActionError::NotAuthor) | Err(PostActionError::NotFound) => {
            render_not_found_response(shell)
        }
        Err(err) => render_server_error_response(shell, err.to_string()),
    }
}

async fn store_image(
    state: &HttpState,
    shell: &PageShell,
    image: Option<(String, Bytes)>,
) -> Result<Option<String>, Response> {
    let Some((file_name, payload)) = image else {
        return Ok(None);
    };

    state
        .uploads
        .store(&file_name, payload)
        .await
        .map(Some)
        .map_err(|err| render_server_error_response(shell.clone(), err.to_string()))
}
