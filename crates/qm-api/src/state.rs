use std::sync::Arc;

use qm_core::catalog::ResourceCache;
use qm_core::provision::Provisioner;
use qm_core::store::PreferenceStore;

#[derive(Clone)]
pub struct AppState {
    pub provisioner: Arc<Provisioner>,
    pub cache: Arc<ResourceCache>,
    pub store: Arc<dyn PreferenceStore>,
}
