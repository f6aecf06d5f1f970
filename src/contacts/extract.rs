//! Request body extractors that accept either JSON or an HTML form post.

use axum::extract::{FromRequest, Request};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::Deserialize;
use serde::de::DeserializeOwned;

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// Body decoded as JSON when the request says so, as
/// `application/x-www-form-urlencoded` otherwise.
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_json(req.headers()) {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(value))
        }
    }
}

#[derive(Deserialize)]
struct SelectionBody {
    #[serde(default)]
    selected_contact_ids: Vec<String>,
}

/// Raw ids from a bulk-delete request.
///
/// JSON bodies carry `{"selected_contact_ids": [..]}`. Form bodies repeat the
/// `selected_contact_ids` key once per checked box.
pub struct SelectedIds(pub Vec<String>);

impl<S> FromRequest<S> for SelectedIds
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_json(req.headers()) {
            let Json(body) = Json::<SelectionBody>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(body.selected_contact_ids))
        } else {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            let ids = pairs
                .into_iter()
                .filter(|(key, _)| key == "selected_contact_ids")
                .map(|(_, value)| value)
                .collect();
            Ok(Self(ids))
        }
    }
}
