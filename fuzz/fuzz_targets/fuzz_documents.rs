#![no_main]

use libfuzzer_sys::fuzz_target;
use dynsql::{named_params, Renderer, RenderConfig, StatementRegistry};

fuzz_target!(|data: &[u8]| {
    // Convert bytes to string, skip invalid UTF-8
    if let Ok(xml) = std::str::from_utf8(data) {
        let mut registry = StatementRegistry::new();
        // Loading should never panic, only return Ok or Err
        if registry.load_str(xml).is_err() {
            assert!(registry.is_empty());
            return;
        }

        let config = RenderConfig::default();
        let renderer = Renderer::new(&registry, &config);
        let params = named_params! { id: 1, ids: vec![1, 2] };
        for name in registry.names() {
            let _ = renderer.render(name, &params);
        }
    }
});
