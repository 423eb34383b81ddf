//! Bring! shopping list backend over its REST API.
//!
//! Active items are the list's `purchase` entries; items ticked off in the
//! app move to `recently` and are therefore already absent from snapshots.
//! Every request goes through one `ureq::Agent` carrying the configured
//! per-request timeout, so a slow server surfaces as `Unavailable`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use cartsync_core::ListRef;

use crate::error::RemoteError;
use crate::service::ListService;
use crate::session::{self, Session};

const SERVICE: &str = "bring";
pub const DEFAULT_BASE_URL: &str = "https://api.getbring.com/rest";

/// Login material read from the environment at startup.
#[derive(Debug, Clone)]
pub struct BringCredentials {
    pub email: String,
    pub password: String,
    pub api_key: String,
}

pub struct BringService {
    agent: ureq::Agent,
    base_url: String,
    credentials: BringCredentials,
    home: PathBuf,
    session: Option<Session>,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AuthResponse {
    uuid: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ListsResponse {
    #[serde(default)]
    lists: Vec<BringList>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BringList {
    list_uuid: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ItemsResponse {
    #[serde(default)]
    purchase: Vec<BringItem>,
    #[serde(default)]
    items: Option<NestedItems>,
}

#[derive(Debug, Deserialize)]
struct NestedItems {
    #[serde(default)]
    purchase: Vec<BringItem>,
}

#[derive(Debug, Deserialize)]
struct BringItem {
    #[serde(alias = "itemId")]
    name: String,
}

pub(crate) fn parse_lists(body: &str) -> Result<Vec<ListRef>, serde_json::Error> {
    let parsed: ListsResponse = serde_json::from_str(body)?;
    Ok(parsed
        .lists
        .into_iter()
        .map(|list| ListRef::new(list.list_uuid, list.name))
        .collect())
}

pub(crate) fn parse_items(body: &str) -> Result<Vec<String>, serde_json::Error> {
    let parsed: ItemsResponse = serde_json::from_str(body)?;
    let nested = parsed.items.map(|items| items.purchase).unwrap_or_default();
    Ok(parsed
        .purchase
        .into_iter()
        .chain(nested)
        .map(|item| item.name)
        .collect())
}

/// Form body for `PUT /v2/bringlists/<uuid>`; exactly one of the two names
/// is non-empty.
pub(crate) fn item_form<'a>(purchase: &'a str, remove: &'a str) -> [(&'static str, &'a str); 5] {
    [
        ("purchase", purchase),
        ("recently", ""),
        ("specification", ""),
        ("remove", remove),
        ("sender", "null"),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusClass {
    /// Session expired or credentials refused.
    Auth,
    /// The request itself was refused.
    Client,
    /// Server-side failure.
    Server,
}

pub(crate) fn classify_status(code: u16) -> StatusClass {
    match code {
        401 | 403 => StatusClass::Auth,
        400..=499 => StatusClass::Client,
        _ => StatusClass::Server,
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

impl BringService {
    pub fn new(
        credentials: BringCredentials,
        base_url: Option<&str>,
        home: &Path,
        timeout: Duration,
    ) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            credentials,
            home: home.to_path_buf(),
            session: None,
        }
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let mut req = self
            .agent
            .request(method, &format!("{}{}", self.base_url, path))
            .set("X-BRING-API-KEY", &self.credentials.api_key)
            .set("X-BRING-CLIENT", "webApp");
        if let Some(session) = &self.session {
            req = req.set("Authorization", &format!("Bearer {}", session.token));
            if let Some(user) = &session.user_id {
                req = req.set("X-BRING-USER-UUID", user);
            }
        }
        req
    }

    fn user_id(&self) -> Result<String, RemoteError> {
        self.session
            .as_ref()
            .and_then(|s| s.user_id.clone())
            .ok_or_else(|| RemoteError::unavailable(SERVICE, "not authenticated"))
    }

    fn login(&mut self) -> Result<(), RemoteError> {
        self.session = None;
        let response = self
            .request("POST", "/v2/bringauth")
            .send_form(&[
                ("email", self.credentials.email.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .map_err(|err| unavailable_from(err, "login"))?;
        let auth: AuthResponse = response
            .into_json()
            .map_err(|err| RemoteError::unavailable(SERVICE, format!("login response: {err}")))?;

        let session = Session::new(&self.credentials.email, auth.access_token, Some(auth.uuid));
        if let Err(err) = session::save_at(&self.home, &session) {
            tracing::warn!("could not cache bring session: {}", err);
        }
        self.session = Some(session);
        tracing::info!("logged in to bring as {}", self.credentials.email);
        Ok(())
    }

    /// Send a request; on 401/403 log in again and resend it once.
    fn send<F>(&mut self, send: F) -> Result<Result<ureq::Response, ureq::Error>, RemoteError>
    where
        F: Fn(&Self) -> Result<ureq::Response, ureq::Error>,
    {
        match send(self) {
            Err(err) if is_auth_failure(&err) => {
                tracing::info!("bring session expired, logging in again");
                if let Err(err) = session::clear_at(&self.home, &self.credentials.email) {
                    tracing::warn!("could not clear stale bring session: {}", err);
                }
                self.login()?;
                Ok(send(self))
            }
            other => Ok(other),
        }
    }

    fn get_body(&mut self, path: &str, what: &str) -> Result<String, RemoteError> {
        self.send(|service| service.request("GET", path).call())?
            .map_err(|err| unavailable_from(err, what))?
            .into_string()
            .map_err(|err| RemoteError::unavailable(SERVICE, format!("{what}: {err}")))
    }

    fn put_item(
        &mut self,
        list: &ListRef,
        item: &str,
        form: &[(&str, &str)],
    ) -> Result<(), RemoteError> {
        let path = format!("/v2/bringlists/{}", list.id);
        match self.send(|service| service.request("PUT", &path).send_form(form))? {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                match classify_status(code) {
                    StatusClass::Client => Err(RemoteError::rejected(
                        SERVICE,
                        item,
                        format!("HTTP {code}: {}", body.trim()),
                    )),
                    StatusClass::Auth | StatusClass::Server => Err(RemoteError::unavailable(
                        SERVICE,
                        format!("update '{item}': HTTP {code}"),
                    )),
                }
            }
            Err(err) => Err(unavailable_from(err, "update")),
        }
    }
}

fn unavailable_from(err: ureq::Error, what: &str) -> RemoteError {
    match err {
        ureq::Error::Status(code, _) => {
            RemoteError::unavailable(SERVICE, format!("{what}: HTTP {code}"))
        }
        ureq::Error::Transport(transport) => {
            RemoteError::unavailable(SERVICE, format!("{what}: {transport}"))
        }
    }
}

fn is_auth_failure(err: &ureq::Error) -> bool {
    matches!(err, ureq::Error::Status(code, _) if classify_status(*code) == StatusClass::Auth)
}

impl ListService for BringService {
    fn service_name(&self) -> &str {
        SERVICE
    }

    fn authenticate(&mut self) -> Result<(), RemoteError> {
        let cached = match session::load_at(&self.home, &self.credentials.email) {
            Ok(cached) => cached,
            Err(err) => {
                tracing::warn!("ignoring unreadable bring session: {}", err);
                None
            }
        };
        let Some(cached) = cached else {
            return self.login();
        };

        self.session = Some(cached);
        let user = self.user_id()?;
        match self.request("GET", &format!("/bringusers/{user}/lists")).call() {
            Ok(_) => {
                tracing::info!("resumed cached bring session");
                Ok(())
            }
            Err(err) if is_auth_failure(&err) => {
                tracing::info!("cached bring session expired, logging in again");
                if let Err(err) = session::clear_at(&self.home, &self.credentials.email) {
                    tracing::warn!("could not clear stale bring session: {}", err);
                }
                self.login()
            }
            Err(err) => Err(unavailable_from(err, "session check")),
        }
    }

    fn available_lists(&mut self) -> Result<Vec<ListRef>, RemoteError> {
        let user = self.user_id()?;
        let body = self.get_body(&format!("/bringusers/{user}/lists"), "load lists")?;
        parse_lists(&body)
            .map_err(|err| RemoteError::unavailable(SERVICE, format!("lists response: {err}")))
    }

    fn active_items(&mut self, list: &ListRef) -> Result<Vec<String>, RemoteError> {
        let body = self.get_body(&format!("/v2/bringlists/{}", list.id), "load items")?;
        parse_items(&body)
            .map_err(|err| RemoteError::unavailable(SERVICE, format!("items response: {err}")))
    }

    fn add_item(&mut self, list: &ListRef, name: &str) -> Result<(), RemoteError> {
        self.put_item(list, name, &item_form(name, ""))
    }

    fn remove_item(&mut self, list: &ListRef, name: &str) -> Result<(), RemoteError> {
        self.put_item(list, name, &item_form("", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::{Arc, Mutex};

    use tempfile::TempDir;

    type Handler = fn(&str, Option<&str>) -> (u16, &'static str);

    /// One-response-per-connection HTTP server on localhost. Records
    /// `"METHOD /path"` for every request it serves.
    fn stub_server(handler: Handler) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}/rest", listener.local_addr().unwrap());
        let log = Arc::new(Mutex::new(Vec::new()));
        let requests = log.clone();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                serve(stream, handler, &requests);
            }
        });
        (base_url, log)
    }

    fn serve(mut stream: TcpStream, handler: Handler, log: &Mutex<Vec<String>>) {
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        let mut auth = None;
        let mut length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("authorization") {
                    auth = Some(value.trim().to_string());
                } else if name.eq_ignore_ascii_case("content-length") {
                    length = value.trim().parse().unwrap();
                }
            }
        }
        let mut body = vec![0; length];
        reader.read_exact(&mut body).unwrap();

        let mut parts = request_line.split_whitespace();
        let call = format!("{} {}", parts.next().unwrap(), parts.next().unwrap());
        log.lock().unwrap().push(call.clone());
        let (code, body) = handler(&call, auth.as_deref());
        write!(
            stream,
            "HTTP/1.1 {code} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .unwrap();
    }

    /// Accepts only the `fresh` token; login hands that token out.
    fn expiring_backend(call: &str, auth: Option<&str>) -> (u16, &'static str) {
        match (call, auth) {
            ("POST /rest/v2/bringauth", _) => (200, r#"{"uuid":"u-1","access_token":"fresh"}"#),
            (_, Some("Bearer fresh")) if call.starts_with("GET") => {
                (200, r#"{"uuid":"L","purchase":[{"name":"Milch"}]}"#)
            }
            (_, Some("Bearer fresh")) => (200, ""),
            _ => (401, r#"{"message":"token expired"}"#),
        }
    }

    fn refusing_backend(_call: &str, _auth: Option<&str>) -> (u16, &'static str) {
        (401, r#"{"message":"bad credentials"}"#)
    }

    fn service_with_stale_session(base_url: &str, home: &Path) -> BringService {
        let mut service = BringService::new(
            BringCredentials {
                email: "me@example.com".into(),
                password: "pw".into(),
                api_key: "key".into(),
            },
            Some(base_url),
            home,
            Duration::from_secs(5),
        );
        service.session = Some(Session::new("me@example.com", "stale", Some("u-1".into())));
        service
    }

    fn home_list() -> ListRef {
        ListRef::new("L", "Home")
    }

    #[test]
    fn expired_session_is_renewed_and_request_retried() {
        let home = TempDir::new().unwrap();
        let (base_url, log) = stub_server(expiring_backend);
        let mut service = service_with_stale_session(&base_url, home.path());

        assert_eq!(service.active_items(&home_list()).unwrap(), vec!["Milch"]);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "GET /rest/v2/bringlists/L",
                "POST /rest/v2/bringauth",
                "GET /rest/v2/bringlists/L",
            ]
        );
        let cached = session::load_at(home.path(), "me@example.com")
            .unwrap()
            .expect("renewed session cached");
        assert_eq!(cached.token, "fresh");

        // The renewed session is reused by the next pass.
        assert_eq!(service.active_items(&home_list()).unwrap(), vec!["Milch"]);
        assert_eq!(log.lock().unwrap().len(), 4);
    }

    #[test]
    fn expired_session_is_renewed_for_item_updates() {
        let home = TempDir::new().unwrap();
        let (base_url, log) = stub_server(expiring_backend);
        let mut service = service_with_stale_session(&base_url, home.path());

        service.add_item(&home_list(), "Eier").unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "PUT /rest/v2/bringlists/L",
                "POST /rest/v2/bringauth",
                "PUT /rest/v2/bringlists/L",
            ]
        );
    }

    #[test]
    fn refused_login_is_unavailable_after_one_attempt() {
        let home = TempDir::new().unwrap();
        let (base_url, log) = stub_server(refusing_backend);
        let mut service = service_with_stale_session(&base_url, home.path());

        let err = service.active_items(&home_list()).unwrap_err();
        assert!(!err.is_rejected());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["GET /rest/v2/bringlists/L", "POST /rest/v2/bringauth"]
        );
    }

    #[test]
    fn parses_list_descriptors() {
        let body = r#"{"lists":[
            {"listUuid":"a-1","name":"Home","theme":"ch.publisheria.bring.theme.home"},
            {"listUuid":"b-2","name":"Cabin"}
        ]}"#;
        let lists = parse_lists(body).unwrap();
        assert_eq!(lists, vec![ListRef::new("a-1", "Home"), ListRef::new("b-2", "Cabin")]);
    }

    #[test]
    fn parses_flat_purchase_items_only() {
        let body = r#"{"uuid":"a-1","status":"REGISTERED",
            "purchase":[{"name":"Milch","specification":"1l"},{"name":"Eier","specification":""}],
            "recently":[{"name":"Brot","specification":""}]}"#;
        assert_eq!(parse_items(body).unwrap(), vec!["Milch", "Eier"]);
    }

    #[test]
    fn parses_nested_purchase_items() {
        let body = r#"{"uuid":"a-1","items":{
            "purchase":[{"itemId":"Käse","specification":""}],
            "recently":[{"itemId":"Brot","specification":""}]}}"#;
        assert_eq!(parse_items(body).unwrap(), vec!["Käse"]);
    }

    #[test]
    fn empty_list_body_yields_no_items() {
        assert!(parse_items(r#"{"uuid":"a-1"}"#).unwrap().is_empty());
    }

    #[test]
    fn item_form_sets_exactly_one_operation() {
        let add = item_form("milk", "");
        assert!(add.contains(&("purchase", "milk")));
        assert!(add.contains(&("remove", "")));
        let remove = item_form("", "milk");
        assert!(remove.contains(&("purchase", "")));
        assert!(remove.contains(&("remove", "milk")));
    }

    #[test]
    fn status_classes() {
        assert_eq!(classify_status(401), StatusClass::Auth);
        assert_eq!(classify_status(403), StatusClass::Auth);
        assert_eq!(classify_status(400), StatusClass::Client);
        assert_eq!(classify_status(404), StatusClass::Client);
        assert_eq!(classify_status(500), StatusClass::Server);
        assert_eq!(classify_status(503), StatusClass::Server);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let service = BringService::new(
            BringCredentials {
                email: "me@example.com".into(),
                password: "pw".into(),
                api_key: "key".into(),
            },
            Some("http://localhost:9/rest/"),
            Path::new("/tmp"),
            Duration::from_secs(1),
        );
        assert_eq!(service.base_url, "http://localhost:9/rest");
        assert!(service.user_id().is_err(), "no session before authenticate");
    }
}
