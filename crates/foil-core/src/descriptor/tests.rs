use super::*;
use crate::ErrorKind;

fn direct() -> PartialDescriptor {
    PartialDescriptor::new()
        .with_address("localhost")
        .with_port(27017)
        .with_timeout_ms(5000)
}

fn tunneled() -> PartialDescriptor {
    direct().with_tunnel("bastion.example.com", 22, "deploy", "/keys/id_rsa", 27017)
}

mod validate_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validate_direct() {
        let descriptor = direct().validate().unwrap();

        assert_eq!(
            descriptor,
            ConnectionDescriptor {
                address: "localhost".to_string(),
                port: 27017,
                timeout_ms: 5000,
                database_name: None,
                tunnel: None,
            }
        );
        assert!(!descriptor.use_tunnel());
        assert_eq!(descriptor.timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_validate_tunneled() {
        let descriptor = tunneled().validate().unwrap();
        let tunnel = descriptor.tunnel.clone().unwrap();

        assert!(descriptor.use_tunnel());
        assert_eq!(tunnel.host, "bastion.example.com");
        assert_eq!(tunnel.port, 22);
        assert_eq!(tunnel.username, "deploy");
        assert_eq!(tunnel.private_key_path, PathBuf::from("/keys/id_rsa"));
        assert_eq!(tunnel.remote_port, 27017);
    }

    #[test]
    fn test_missing_required_fields() {
        let cases = [
            (PartialDescriptor { address: None, ..direct() }, "address"),
            (PartialDescriptor { port: None, ..direct() }, "port"),
            (PartialDescriptor { timeout_ms: None, ..direct() }, "timeout"),
        ];

        for (partial, field) in cases {
            match partial.validate() {
                Err(FoilError::IncompleteDescriptor { field: got }) => assert_eq!(got, field),
                other => panic!("expected IncompleteDescriptor for {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_empty_address_is_missing() {
        let err = direct().with_address("  ").validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompleteDescriptor);
        assert_eq!(err.to_string(), "Cannot connect, no address set");
    }

    #[test]
    fn test_tunnel_without_host() {
        let partial = PartialDescriptor {
            tunnel_host: None,
            ..tunneled()
        };

        match partial.validate() {
            Err(FoilError::IncompleteDescriptor { field }) => assert_eq!(field, "tunnel.host"),
            other => panic!("expected IncompleteDescriptor, got {:?}", other),
        }
    }

    #[test]
    fn test_every_tunnel_field_is_required() {
        let cases = [
            (PartialDescriptor { tunnel_port: None, ..tunneled() }, "tunnel.port"),
            (
                PartialDescriptor { tunnel_username: Some(String::new()), ..tunneled() },
                "tunnel.username",
            ),
            (
                PartialDescriptor { private_key_path: None, ..tunneled() },
                "tunnel.private_key_path",
            ),
            (PartialDescriptor { remote_port: None, ..tunneled() }, "tunnel.remote_port"),
        ];

        for (partial, field) in cases {
            match partial.validate() {
                Err(FoilError::IncompleteDescriptor { field: got }) => assert_eq!(got, field),
                other => panic!("expected IncompleteDescriptor for {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_tunnel_fields_ignored_when_disabled() {
        let partial = PartialDescriptor {
            tunnel_host: None,
            ..tunneled().without_tunnel()
        };
        let descriptor = partial.validate().unwrap();
        assert!(descriptor.tunnel.is_none());
    }

    #[test]
    fn test_unset_use_tunnel_means_direct() {
        let partial = PartialDescriptor {
            use_tunnel: None,
            ..tunneled()
        };
        assert!(!partial.validate().unwrap().use_tunnel());
    }

    #[test]
    fn test_port_out_of_range() {
        for port in [0, -1, 65536, 100_000] {
            let err = direct().with_port(port).validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidDescriptor, "port {}", port);
            assert!(err.to_string().contains("port"));
        }

        assert_eq!(direct().with_port(65535).validate().unwrap().port, 65535);
        assert_eq!(direct().with_port(1).validate().unwrap().port, 1);
    }

    #[test]
    fn test_tunnel_port_out_of_range() {
        let partial = PartialDescriptor {
            remote_port: Some(70000),
            ..tunneled()
        };
        match partial.validate() {
            Err(FoilError::InvalidDescriptor { field, .. }) => {
                assert_eq!(field, "tunnel.remote_port")
            }
            other => panic!("expected InvalidDescriptor, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout_must_be_positive() {
        for timeout in [0, -5] {
            let err = direct().with_timeout_ms(timeout).validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidDescriptor);
            assert!(err.to_string().contains("timeout"));
        }
    }

    #[test]
    fn test_empty_database_name_is_dropped() {
        let descriptor = direct().with_database_name("").validate().unwrap();
        assert_eq!(descriptor.database_name, None);

        let descriptor = direct().with_database_name("foil").validate().unwrap();
        assert_eq!(descriptor.database_name.as_deref(), Some("foil"));
    }
}

mod partial_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_or_keeps_set_fields() {
        let overrides = PartialDescriptor::new().with_address("db.internal");
        let fallback = direct();

        let merged = overrides.or(&fallback);
        assert_eq!(merged.address.as_deref(), Some("db.internal"));
        assert_eq!(merged.port, Some(27017));
        assert_eq!(merged.timeout_ms, Some(5000));
        assert_eq!(merged.use_tunnel, None);
    }

    #[test]
    fn test_or_with_empty_fallback() {
        assert_eq!(direct().or(&PartialDescriptor::new()), direct());
        assert_eq!(PartialDescriptor::new().or(&direct()), direct());
    }
}

mod derived_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tunnel_config_forwards_local_port() {
        let descriptor = tunneled().validate().unwrap();
        let config = descriptor.tunnel_config().unwrap();

        assert_eq!(config.host, "bastion.example.com");
        assert_eq!(config.port, 22);
        assert_eq!(config.username, "deploy");
        assert_eq!(config.bind_host, TUNNEL_BIND_HOST);
        assert_eq!(config.bind_port, 27017);
        assert_eq!(config.forward_host, TUNNEL_FORWARD_HOST);
        assert_eq!(config.forward_port, 27017);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_no_tunnel_config_when_direct() {
        assert!(direct().validate().unwrap().tunnel_config().is_none());
    }

    #[test]
    fn test_driver_target() {
        let descriptor = direct().with_database_name("foil").validate().unwrap();
        let target = descriptor.driver_target();

        assert_eq!(target.address, "localhost");
        assert_eq!(target.port, 27017);
        assert_eq!(target.timeout, Duration::from_millis(5000));
        assert_eq!(target.database.as_deref(), Some("foil"));
        assert_eq!(target.to_string(), "localhost:27017");
    }
}
