use std::sync::{Arc, OnceLock};

use skylight_optics::OpticalLuts;

/// LUTs built once per test binary.
pub(crate) fn shared_luts() -> Arc<OpticalLuts> {
    static LUTS: OnceLock<Arc<OpticalLuts>> = OnceLock::new();
    LUTS.get_or_init(|| Arc::new(OpticalLuts::build())).clone()
}
