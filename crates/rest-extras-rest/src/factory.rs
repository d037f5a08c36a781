//! Viewset generation.
//!
//! Each filter entry becomes a [`Resource`] served by one [`ModelViewSet`],
//! registered under `app_label-model_name`. Blacklisted paths and models
//! without a manager are skipped.

use std::sync::Arc;

use rest_extras_core::ExtrasResult;

use crate::authentication::authentication_classes;
use crate::context::HostContext;
use crate::discovery::{FilterEntry, FilterMap};
use crate::permissions::permission_classes;
use crate::router::DefaultRouter;
use crate::viewsets::{ModelViewSet, Resource, ViewSet};

/// Builds the resource for one entry, or `None` when the model has no
/// manager.
fn resource_for(ctx: &HostContext, entry: &FilterEntry) -> ExtrasResult<Option<Resource>> {
    let Some(class) = ctx.catalog().model_class(&entry.content_type, ctx.models()) else {
        tracing::debug!(content_type = %entry.content_type, "no model for content type");
        return Ok(None);
    };
    let Some(manager) = class.objects() else {
        tracing::debug!(model = %class.meta.model_key(), "model has no manager, skipping");
        return Ok(None);
    };
    let settings = &ctx.settings().rest_framework_extras;
    Ok(Some(Resource {
        content_type: Some(entry.content_type.clone()),
        meta: Arc::clone(&class.meta),
        manager: Arc::clone(manager),
        delegation: entry.delegation(),
        authentication_classes: authentication_classes(&settings.authentication_classes)?,
        permission_classes: permission_classes(&settings.permission_classes)?,
    }))
}

/// Registers a viewset for every entry. Returns how many were registered.
pub fn register_filters(router: &mut DefaultRouter, ctx: &HostContext, filters: &FilterMap) -> ExtrasResult<usize> {
    let settings = &ctx.settings().rest_framework_extras;
    let mut registered = 0;
    for (key, entry) in filters.iter() {
        let path = entry.path();
        if settings.is_blacklisted(&path) {
            tracing::debug!(path = %path, "blacklisted, skipping");
            continue;
        }
        let Some(resource) = resource_for(ctx, entry)? else {
            continue;
        };
        let viewset = ModelViewSet::new(resource);
        tracing::debug!(model = key, path = %path, viewset = viewset.name(), "registering");
        router.register_replacing(&path, Arc::new(viewset));
        registered += 1;
    }
    Ok(registered)
}
