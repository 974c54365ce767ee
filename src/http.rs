//! HTTP request adapter over `may_minihttp`.
//!
//! [`route`] turns `(method, path, body)` into a [`Reply`] and holds every
//! status-code decision; [`CatalogHttpService`] only moves bytes between the
//! socket and `route`.
//!
//! | Route                  | Success | Not found | Bad input | Backend down |
//! |------------------------|---------|-----------|-----------|--------------|
//! | `GET /ping`            | 200     |           |           |              |
//! | `GET /products`        | 200     |           |           | 500          |
//! | `POST /products`       | 201     |           | 400       | 500          |
//! | `GET /product/{id}`    | 200     | 404       | 400       | 500          |
//! | `PUT /product/{id}`    | 200     | 404       | 400       | 500          |
//! | `PATCH /product/{id}`  | 200     | 404       | 400       | 500          |
//! | `DELETE /product/{id}` | 200     | 404       | 400       | 500          |

use crate::error::CatalogError;
use crate::model::{NewProduct, ProductPatch};
use crate::service::CatalogService;
use crate::store::ProductStore;
use may::coroutine::JoinHandle;
use may_minihttp::{HttpServer, HttpService, Request, Response};
use serde::Serialize;
use std::io::{self, Read};
use std::net::ToSocketAddrs;

const JSON: &str = "Content-Type: application/json";
#[cfg(feature = "metrics")]
const TEXT: &str = "Content-Type: text/plain; version=0.0.4; charset=utf-8";

/// A fully decided response.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                content_type: JSON,
                body,
            },
            Err(e) => Self::message(500, &format!("failed to encode response: {e}")),
        }
    }

    fn message(status: u16, message: &str) -> Self {
        let body = serde_json::json!({ "message": message }).to_string().into_bytes();
        Self {
            status,
            content_type: JSON,
            body,
        }
    }

    fn failure(err: &CatalogError) -> Self {
        match err {
            CatalogError::InvalidInput(msg) => Self::message(400, msg),
            CatalogError::BackendUnavailable(e) => {
                log::error!("backend failure: {e}");
                Self::message(500, "internal error")
            }
        }
    }
}

/// Reason phrase for the status codes this adapter emits.
pub fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "Internal Server Error",
    }
}

/// Decide the response for one request.
///
/// The query string and a trailing slash are ignored. Backend failures become
/// a 500 whose body never carries backend details; the cause is logged.
///
/// # Examples
///
/// ```rust,ignore
/// use stockroom::{http::route, CatalogService, MemoryProductStore};
///
/// let catalog = CatalogService::new(MemoryProductStore::new());
/// let reply = route(&catalog, "POST", "/products", br#"{"name":"Widget","price":9.99}"#);
/// assert_eq!(reply.status, 201);
/// assert_eq!(route(&catalog, "GET", "/product/1", b"").status, 200);
/// assert_eq!(route(&catalog, "GET", "/product/2", b"").status, 404);
/// ```
pub fn route<S: ProductStore>(
    catalog: &CatalogService<S>,
    method: &str,
    path: &str,
    body: &[u8],
) -> Reply {
    let path = path.split('?').next().unwrap_or("");
    let segments: Vec<&str> = path.trim_end_matches('/').split('/').skip(1).collect();

    match (method, segments.as_slice()) {
        ("GET", ["ping"]) => Reply::message(200, "pong"),
        #[cfg(feature = "metrics")]
        ("GET", ["metrics"]) => match crate::metrics::METRICS.render() {
            Ok(text) => Reply {
                status: 200,
                content_type: TEXT,
                body: text.into_bytes(),
            },
            Err(e) => Reply::message(500, &format!("failed to render metrics: {e}")),
        },
        ("GET", ["products"]) => match catalog.list_products() {
            Ok(products) => Reply::json(200, &products),
            Err(e) => Reply::failure(&e),
        },
        ("POST", ["products"]) => {
            let candidate: NewProduct = match decode(body) {
                Ok(candidate) => candidate,
                Err(reply) => return reply,
            };
            match catalog.create_product(candidate) {
                Ok(product) => Reply::json(201, &product),
                Err(e) => Reply::failure(&e),
            }
        }
        (_, ["products"]) => Reply::message(405, "method not allowed"),
        (_, ["product"]) => Reply::message(400, "product id must not be empty"),
        (method, ["product", raw_id]) => {
            let Ok(id) = raw_id.parse::<i32>() else {
                return Reply::message(400, "product id must be a number");
            };
            product_route(catalog, method, id, body)
        }
        _ => Reply::message(404, "route not found"),
    }
}

fn product_route<S: ProductStore>(
    catalog: &CatalogService<S>,
    method: &str,
    id: i32,
    body: &[u8],
) -> Reply {
    let outcome = match method {
        "GET" => catalog.get_product(id),
        "PUT" | "PATCH" => {
            let patch: ProductPatch = match decode(body) {
                Ok(patch) => patch,
                Err(reply) => return reply,
            };
            if method == "PUT" {
                catalog.update_product(id, patch)
            } else {
                catalog.update_product_atomic(id, patch)
            }
        }
        "DELETE" => {
            return match catalog.delete_product(id) {
                Ok(true) => Reply::message(200, "product deleted"),
                Ok(false) => Reply::message(404, "product not found"),
                Err(e) => Reply::failure(&e),
            };
        }
        _ => return Reply::message(405, "method not allowed"),
    };

    match outcome {
        Ok(Some(product)) => Reply::json(200, &product),
        Ok(None) => Reply::message(404, "product not found"),
        Err(e) => Reply::failure(&e),
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, Reply> {
    serde_json::from_slice(body)
        .map_err(|e| Reply::message(400, &format!("invalid JSON body: {e}")))
}

/// `may_minihttp` service wrapping the catalog; one clone per connection.
pub struct CatalogHttpService<S> {
    catalog: CatalogService<S>,
}

impl<S> Clone for CatalogHttpService<S> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
        }
    }
}

impl<S: ProductStore> CatalogHttpService<S> {
    pub fn new(catalog: CatalogService<S>) -> Self {
        Self { catalog }
    }
}

impl<S: ProductStore> HttpService for CatalogHttpService<S> {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let method = req.method().to_string();
        let path = req.path().to_string();
        let mut body = Vec::new();
        req.body().read_to_end(&mut body)?;

        let reply = route(&self.catalog, &method, &path, &body);
        log::info!("{method} {path} -> {}", reply.status);

        res.status_code(usize::from(reply.status), reason(reply.status));
        res.header(reply.content_type);
        res.body_vec(reply.body);
        Ok(())
    }
}

/// Start serving on `addr`; the handle completes when the server stops.
///
/// Each accepted connection runs on its own `may` coroutine with a clone of
/// `catalog`.
///
/// # Errors
///
/// Returns the `io::Error` from binding the listener (address in use,
/// unresolvable address).
pub fn serve<S, A>(catalog: CatalogService<S>, addr: A) -> io::Result<JoinHandle<()>>
where
    S: ProductStore + 'static,
    A: ToSocketAddrs,
{
    HttpServer(CatalogHttpService::new(catalog)).start(addr)
}
