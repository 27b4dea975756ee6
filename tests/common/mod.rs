//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

pub mod fake_appliance;
pub mod mock_nitro;

use nsroute::{FrontVserverSpec, RouteManager, RoutingIntent};

pub use fake_appliance::{Call, FakeAppliance, Op};

/// Intent routing `host` + `path` on `front` to `service` at 10.0.0.5:8080.
pub fn intent(front: &str, host: &str, path: &str, service: &str, priority: u32) -> RoutingIntent {
    RoutingIntent {
        namespace: "default".to_string(),
        front_vserver: front.to_string(),
        host: host.to_string(),
        path: path.to_string(),
        service_name: service.to_string(),
        backend_ip: "10.0.0.5".parse().unwrap(),
        backend_port: 8080,
        priority,
    }
}

/// Appliance with the given front vservers already created.
pub fn appliance_with_fronts(fronts: &[&str]) -> FakeAppliance {
    let appliance = FakeAppliance::new();
    {
        let manager = RouteManager::new(&appliance);
        for (i, front) in fronts.iter().enumerate() {
            manager
                .create_front_vserver(&FrontVserverSpec {
                    name: front.to_string(),
                    ip: format!("192.168.1.{}", i + 10).parse().unwrap(),
                    port: 80,
                    protocol: "HTTP".to_string(),
                })
                .expect("create front vserver");
        }
    }
    appliance.clear_ops();
    appliance
}
