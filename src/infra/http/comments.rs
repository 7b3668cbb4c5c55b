//! Comment create/edit/delete handlers.

use axum::{
    extract::{Form, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::{
    application::comments::CommentActionError,
    presentation::views::{
        CommentDeleteContext, CommentDeleteTemplate, CommentFormContext, CommentFormTemplate,
        LayoutContext, PageShell, post_path, render_csrf_failure_response,
        render_not_found_response, render_server_error_response, render_template_response,
    },
};

use super::HttpState;
use super::extract::{CsrfToken, CurrentUser};
use super::public::parse_id;
use crate::domain::visibility::Viewer;

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub csrf_token: String,
}

fn comment_error_response(err: CommentActionError, shell: PageShell) -> Response {
    match err {
        CommentActionError::NotFound | CommentActionError::NotAuthor => {
            render_not_found_response(shell)
        }
        CommentActionError::Validation(message) => render_server_error_response(shell, message),
        CommentActionError::Repo(err) => render_server_error_response(shell, err.to_string()),
    }
}

pub async fn create(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    csrf: CsrfToken,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf.0.clone());
    let Some(post_id) = parse_id(&id) else {
        return render_not_found_response(shell);
    };

    if !csrf.matches(&form.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    match state.comments.add(post_id, &user, form.text.clone()).await {
        Ok(_) => Redirect::to(&post_path(post_id)).into_response(),
        Err(CommentActionError::Validation(message)) => {
            let content = CommentFormContext {
                heading: "Add comment".to_string(),
                action: format!("/posts/{post_id}/comment/"),
                text_value: form.text,
                error: message,
                has_error: true,
            };
            render_template_response(
                CommentFormTemplate {
                    view: LayoutContext::new(shell, content),
                },
                StatusCode::OK,
            )
        }
        Err(err) => comment_error_response(err, shell),
    }
}

pub async fn edit_form(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    CsrfToken(csrf): CsrfToken,
    Path((id, cid)): Path<(String, String)>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf);
    let (Some(post_id), Some(comment_id)) = (parse_id(&id), parse_id(&cid)) else {
        return render_not_found_response(shell);
    };

    match state
        .comments
        .load_own(post_id, comment_id, Viewer::User(user.id))
        .await
    {
        Ok(comment) => {
            let content = CommentFormContext {
                heading: "Edit comment".to_string(),
                action: format!("/posts/{post_id}/comment/{comment_id}/edit/"),
                text_value: comment.text,
                error: String::new(),
                has_error: false,
            };
            render_template_response(
                CommentFormTemplate {
                    view: LayoutContext::new(shell, content),
                },
                StatusCode::OK,
            )
        }
        Err(err) => comment_error_response(err, shell),
    }
}

pub async fn update(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    csrf: CsrfToken,
    Path((id, cid)): Path<(String, String)>,
    Form(form): Form<CommentForm>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf.0.clone());
    let (Some(post_id), Some(comment_id)) = (parse_id(&id), parse_id(&cid)) else {
        return render_not_found_response(shell);
    };

    if !csrf.matches(&form.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    match state
        .comments
        .update(post_id, comment_id, Viewer::User(user.id), form.text.clone())
        .await
    {
        Ok(_) => Redirect::to(&post_path(post_id)).into_response(),
        Err(CommentActionError::Validation(message)) => {
            let content = CommentFormContext {
                heading: "Edit comment".to_string(),
                action: format!("/posts/{post_id}/comment/{comment_id}/edit/"),
                text_value: form.text,
                error: message,
                has_error: true,
            };
            render_template_response(
                CommentFormTemplate {
                    view: LayoutContext::new(shell, content),
                },
                StatusCode::OK,
            )
        }
        Err(err) => comment_error_response(err, shell),
    }
}

pub async fn delete_confirm(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    CsrfToken(csrf): CsrfToken,
    Path((id, cid)): Path<(String, String)>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf);
    let (Some(post_id), Some(comment_id)) = (parse_id(&id), parse_id(&cid)) else {
        return render_not_found_response(shell);
    };

    match state
        .comments
        .load_own(post_id, comment_id, Viewer::User(user.id))
        .await
    {
        Ok(comment) => {
            let content = CommentDeleteContext {
                text: comment.text,
                action: format!("/posts/{post_id}/comment/{comment_id}/delete/"),
            };
            render_template_response(
                CommentDeleteTemplate {
                    view: LayoutContext::new(shell, content),
                },
                StatusCode::OK,
            )
        }
        Err(err) => comment_error_response(err, shell),
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    pub csrf_token: String,
}

pub async fn delete(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    csrf: CsrfToken,
    Path((id, cid)): Path<(String, String)>,
    Form(form): Form<DeleteForm>,
) -> Response {
    let shell = PageShell::new(Some(&user), csrf.0.clone());
    let (Some(post_id), Some(comment_id)) = (parse_id(&id), parse_id(&cid)) else {
        return render_not_found_response(shell);
    };

    if !csrf.matches(&form.csrf_token) {
        return render_csrf_failure_response(shell);
    }

    match state
        .comments
        .delete(post_id, comment_id, Viewer::User(user.id))
        .await
    {
        Ok(()) => Redirect::to(&post_path(post_id)).into_response(),
        Err(err) => comment_error_response(err, shell),
    }
}
