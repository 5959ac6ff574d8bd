pub(crate) mod clip;
pub(crate) mod layer;
pub(crate) mod props;
pub(crate) mod timeline;
