//! # rest-extras-rest
//!
//! REST endpoints for every model a host application registers.
//!
//! [`discover`] walks the content-type catalog, applies the `only`/`overrides`
//! filters from [`DiscoverOptions`], and registers one [`ModelViewSet`] per
//! model on a [`DefaultRouter`] under `app_label-model_name`. Entries can
//! delegate validation and saving to a form or to an admin's form; see
//! [`serializers::FormSerializer`]. [`users::register`] adds the role-aware
//! `auth-user` endpoint.
//!
//! ```rust,ignore
//! let ctx = Arc::new(HostContext::new(settings, db, models));
//! let mut router = DefaultRouter::new();
//! discover(&mut router, &ctx, &DiscoverOptions::default()).await?;
//! users::register(&mut router, &ctx, None)?;
//! let app = router.urls(Arc::clone(&ctx));
//! ```

pub mod api_auth;
pub mod authentication;
pub mod context;
pub mod discovery;
pub mod factory;
pub mod permissions;
pub mod relations;
pub mod request;
pub mod response;
pub mod router;
pub mod serializers;
pub mod users;
pub mod viewsets;

pub use authentication::{Authentication, BasicAuthentication, SessionAuthentication};
pub use context::HostContext;
pub use discovery::{discover, DiscoverOptions, EntryOptions, FilterEntry, FilterMap, OverrideEntry};
pub use factory::register_filters;
pub use permissions::{AllowAny, DjangoModelPermissions, DjangoObjectPermissions, IsAdminUser, IsAuthenticated, Permission};
pub use request::{Action, ApiRequest, RequestData};
pub use response::ApiResponse;
pub use router::DefaultRouter;
pub use serializers::{FormDelegation, FormSerializer, ModelSerializer, Serializer, SerializerOptions};
pub use users::{UserPermissions, UsersViewSet};
pub use viewsets::{dispatch, ModelViewSet, Resource, ViewSet};
