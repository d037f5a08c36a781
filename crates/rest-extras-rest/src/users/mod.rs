//! The user endpoint.
//!
//! [`register`] wires `auth-user` to [`UsersViewSet`], whose fields and write
//! access depend on the caller's role. See [`serializers`] and
//! [`permissions`].

pub mod permissions;
pub mod serializers;
pub mod viewsets;

use std::sync::Arc;

use rest_extras_core::ExtrasResult;

use crate::context::HostContext;
use crate::router::DefaultRouter;
use crate::viewsets::ViewSet;

pub use permissions::UserPermissions;
pub use serializers::{Role, UserSerializer};
pub use viewsets::UsersViewSet;

/// The prefix the user endpoint is registered under by default.
pub const USERS_PATH: &str = "auth-user";

/// Registers the user endpoint, or the given `(prefix, viewset)` pairs
/// instead. Existing entries with the same prefix are replaced.
pub fn register(
    router: &mut DefaultRouter,
    ctx: &HostContext,
    mapping: Option<Vec<(String, Arc<dyn ViewSet>)>>,
) -> ExtrasResult<()> {
    let mapping = match mapping {
        Some(mapping) => mapping,
        None => {
            let viewset: Arc<dyn ViewSet> = Arc::new(UsersViewSet::new(ctx)?);
            vec![(USERS_PATH.to_string(), viewset)]
        }
    };
    for (prefix, viewset) in mapping {
        tracing::debug!(prefix = %prefix, viewset = viewset.name(), "registering user endpoint");
        router.register_replacing(&prefix, viewset);
    }
    Ok(())
}
