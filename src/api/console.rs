use std::convert::Infallible;

use rocket::State;
use rocket::http::RawStr;
use rocket::http::uri::{Absolute, Origin};
use rocket::request::{FlashMessage, FromRequest, Outcome, Request};
use rocket::response::{Flash, Redirect};
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::{debug, instrument};

use crate::notifications::NotificationDispatcher;
use crate::normalize::key;

/// The page that triggered a console action, as an origin-form target on
/// this host. Absent when the header is missing, unparseable or points
/// at another host.
#[derive(Debug)]
pub struct Referer(Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Referer {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let target = request
            .headers()
            .get_one("Referer")
            .and_then(|referer| same_origin_target(request, referer.trim()));

        if target.is_none() && request.headers().contains("Referer") {
            debug!("Ignoring Referer that is not a page on this host");
        }

        Outcome::Success(Referer(target))
    }
}

fn same_origin_target(request: &Request<'_>, referer: &str) -> Option<String> {
    // "//host/..." is a network-path reference to another host.
    if referer.starts_with("//") {
        return None;
    }
    if let Ok(origin) = Origin::parse(referer) {
        return Some(origin.to_string());
    }

    let absolute = Absolute::parse(referer).ok()?;
    let authority = absolute.authority()?;
    let host = request.host()?;
    if !authority.host().eq_ignore_ascii_case(host.domain().as_str())
        || authority.port() != host.port()
    {
        return None;
    }

    let path = match absolute.path().as_str() {
        "" => "/".to_string(),
        path => path.to_string(),
    };
    let target = match absolute.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    };

    let origin = Origin::parse(&target).ok()?;
    Some(origin.to_string())
}

impl Referer {
    /// Where to send the user back to. Falls back to the project resource.
    fn redirect_for(&self, folio: &str) -> Redirect {
        match &self.0 {
            Some(target) => Redirect::to(target.clone()),
            None => Redirect::to(format!(
                "/api/projects/{}",
                RawStr::new(&key(folio)).percent_encode()
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Banner {
    pub kind: String,
    pub message: String,
}

#[get("/projects/<folio>/send-email")]
#[instrument(skip(db, dispatcher))]
pub async fn console_send_email(
    folio: &str,
    referer: Referer,
    db: &State<Pool<Sqlite>>,
    dispatcher: &State<NotificationDispatcher>,
) -> Flash<Redirect> {
    let redirect = referer.redirect_for(folio);

    match dispatcher.notify_participants(db, folio).await {
        Ok(recipients) => Flash::success(
            redirect,
            format!(
                "Email sent to {} recipient(s) of project {}.",
                recipients.len(),
                key(folio)
            ),
        ),
        Err(e) => {
            e.log_and_record("Console action: notify participants");
            Flash::error(redirect, e.to_string())
        }
    }
}

#[get("/projects/<folio>/send-evaluator-email")]
#[instrument(skip(db, dispatcher))]
pub async fn console_send_evaluator_email(
    folio: &str,
    referer: Referer,
    db: &State<Pool<Sqlite>>,
    dispatcher: &State<NotificationDispatcher>,
) -> Flash<Redirect> {
    let redirect = referer.redirect_for(folio);

    match dispatcher.notify_evaluator(db, folio).await {
        Ok(_) => Flash::success(
            redirect,
            format!("Email sent to the evaluator of project {}.", key(folio)),
        ),
        Err(e) => {
            e.log_and_record("Console action: notify evaluator");
            Flash::error(redirect, e.to_string())
        }
    }
}

/// The pending banner, if any. Reading it clears it.
#[get("/banner")]
pub fn console_banner(flash: Option<FlashMessage<'_>>) -> Json<Option<Banner>> {
    Json(flash.map(|flash| Banner {
        kind: flash.kind().to_string(),
        message: flash.message().to_string(),
    }))
}
