//! Resource binding: path captures to stored entities.
//!
//! Each binder layer resolves exactly one argument, the first one still raw.
//! The nearest resolved entity to its left scopes the lookup as parent, so a
//! nested route stacks one binder per segment, outermost first:
//! `resource(store, "Page", resource(store, "Photo", handler))`.
//!
//! A capture that is not an integer, or names no entity in scope, makes the
//! route produce no response. It never surfaces as an error.

use std::sync::Arc;

use log::debug;

use super::router::{Arg, Handler, handler};
use crate::store::EntityStore;

/// Wrap `inner` so that its first raw argument is replaced by the `kind`
/// entity it identifies.
pub fn resource(store: Arc<dyn EntityStore>, kind: &'static str, inner: Handler) -> Handler {
    handler(move |request, mut args| {
        let Some(index) = args.iter().position(|arg| matches!(arg, Arg::Raw(_))) else {
            debug!("No unresolved argument left for {} binder", kind);
            return Ok(None);
        };
        let Some(raw) = args.raw(index) else {
            return Ok(None);
        };
        let Ok(id) = raw.parse::<i64>() else {
            debug!("Capture '{}' is not a {} id", raw, kind);
            return Ok(None);
        };

        let parent = args
            .iter()
            .take(index)
            .filter_map(Arg::as_entity)
            .last()
            .and_then(|entity| entity.key());

        let Some(entity) = store.get_by_id(kind, id, parent.as_ref())? else {
            match &parent {
                Some(parent) => debug!("No {} {} under {}", kind, id, parent),
                None => debug!("No {} {}", kind, id),
            }
            return Ok(None);
        };

        debug!("Resolved {} {}", kind, id);
        args.replace(index, Arg::Entity(entity));
        inner(request, args)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WikiError;
    use crate::rest::request::Request;
    use crate::rest::response::Response;
    use crate::rest::router::{Args, Router};
    use crate::store::{Entity, EntityStore, Key, MemoryStore};
    use axum::http::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn describe() -> Handler {
        handler(|_, args: Args| {
            let keys: Vec<String> = args
                .iter()
                .map(|arg| match arg {
                    Arg::Entity(entity) => entity.key().map(|k| k.to_string()).unwrap_or_default(),
                    Arg::Raw(raw) => format!("raw:{}", raw),
                })
                .collect();
            Ok(Some(Response::raw(keys.join(" ").into_bytes(), "text/plain")))
        })
    }

    fn body(response: Option<Response>) -> Option<String> {
        match response? {
            Response::Raw { body, .. } => Some(String::from_utf8(body).unwrap()),
            _ => None,
        }
    }

    fn store_with_pages(count: usize) -> (Arc<MemoryStore>, Vec<Key>) {
        let store = Arc::new(MemoryStore::new());
        let keys = (0..count)
            .map(|_| store.put(&mut Entity::new("Page", None)).unwrap())
            .collect();
        (store, keys)
    }

    #[test]
    fn resolves_an_existing_entity() {
        let (store, keys) = store_with_pages(1);
        let bound = resource(store, "Page", describe());
        let args = Args::new(vec![Arg::Raw(keys[0].id().to_string())]);
        let out = body(bound(&Request::get("/"), args).unwrap());
        assert_eq!(out, Some(keys[0].to_string()));
    }

    #[test]
    fn unparsable_or_absent_ids_are_misses() {
        let (store, keys) = store_with_pages(1);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let bound = resource(
            store,
            "Page",
            handler(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Some(Response::redirect("/")))
            }),
        );

        let absent = (keys[0].id() + 1).to_string();
        for raw in ["abc", absent.as_str(), ""] {
            let result = bound(&Request::get("/"), Args::new(vec![Arg::Raw(raw.to_string())]));
            assert!(matches!(result, Ok(None)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stacked_binders_scope_children_under_the_parent() {
        let (store, pages) = store_with_pages(2);
        let photo = store.put(&mut Entity::new("Photo", Some(&pages[0]))).unwrap();
        let dyn_store: Arc<dyn EntityStore> = store;

        let router = Router::new()
            .route(
                r"/pages/([0-9]+)/photos/([0-9]+)",
                Method::GET,
                resource(dyn_store.clone(), "Page", resource(dyn_store, "Photo", describe())),
            )
            .unwrap();

        let good = format!("/pages/{}/photos/{}", pages[0].id(), photo.id());
        let out = body(router.dispatch(&Request::get(good)).unwrap());
        assert_eq!(out, Some(format!("{} {}", pages[0], photo)));

        let wrong_parent = format!("/pages/{}/photos/{}", pages[1].id(), photo.id());
        assert!(router.dispatch(&Request::get(wrong_parent)).unwrap().is_none());
    }

    #[test]
    fn single_binder_leaves_later_captures_raw() {
        let (store, pages) = store_with_pages(1);
        let bound = resource(store, "Page", describe());
        let args = Args::new(vec![Arg::Raw(pages[0].id().to_string()), Arg::Raw("9".into())]);
        let out = body(bound(&Request::get("/"), args).unwrap());
        assert_eq!(out, Some(format!("{} raw:9", pages[0])));
    }

    struct FailingStore;

    impl EntityStore for FailingStore {
        fn get_by_id(&self, _: &str, _: i64, _: Option<&Key>) -> Result<Option<Entity>, WikiError> {
            Err(WikiError::Store("unreachable".into()))
        }
        fn query_all(&self, _: &str, _: Option<&Key>) -> Result<Vec<Entity>, WikiError> {
            Err(WikiError::Store("unreachable".into()))
        }
        fn put(&self, _: &mut Entity) -> Result<Key, WikiError> {
            Err(WikiError::Store("unreachable".into()))
        }
        fn delete(&self, _: &Key) -> Result<(), WikiError> {
            Err(WikiError::Store("unreachable".into()))
        }
    }

    #[test]
    fn store_failures_propagate() {
        let bound = resource(Arc::new(FailingStore), "Page", describe());
        let result = bound(&Request::get("/"), Args::new(vec![Arg::Raw("1".into())]));
        assert!(matches!(result, Err(WikiError::Store(_))));
    }
}
