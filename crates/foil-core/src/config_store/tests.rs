//! Tests for INI config loading, saving and typed access

use super::*;
use crate::ErrorKind;
use tempfile::tempdir;

fn sample_map() -> ConfigMap {
    ConfigMap::from_sections([
        (
            "MongoServer",
            vec![("address", "localhost".to_string()), ("port", "27017".to_string())],
        ),
        (
            "SSHTunnel",
            vec![("use_ssh_tunnel", "False".to_string())],
        ),
    ])
}

mod bool_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_str_to_bool_table() {
        let cases = [
            ("Yes", true),
            ("no", false),
            ("1", true),
            ("0", false),
            ("", false),
            ("YES", true),
        ];
        for (input, expected) in cases {
            assert_eq!(str_to_bool(input), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_every_true_literal_is_true() {
        for literal in TRUE_LITERALS {
            assert!(str_to_bool(literal), "{} should be true", literal);
        }
    }

    #[test]
    fn test_str_to_bool_trims_whitespace() {
        assert!(str_to_bool("  true\t"));
        assert!(!str_to_bool("  false "));
    }

    #[test]
    fn test_mixed_case_is_not_true() {
        assert!(!str_to_bool("tRuE"));
        assert!(!str_to_bool("yEs"));
        assert!(!str_to_bool("on"));
    }

    #[test]
    fn test_classify_distinguishes_unrecognized() {
        assert_eq!(BoolLiteral::classify("no"), BoolLiteral::False);
        assert_eq!(BoolLiteral::classify("N"), BoolLiteral::False);
        assert_eq!(BoolLiteral::classify("y"), BoolLiteral::True);
        assert_eq!(BoolLiteral::classify("maybe"), BoolLiteral::Unrecognized);
        assert_eq!(BoolLiteral::classify(""), BoolLiteral::Unrecognized);
        assert!(!BoolLiteral::Unrecognized.as_bool());
    }
}

mod config_map_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_string() {
        let map = sample_map();
        assert_eq!(map.get("MongoServer", "address").unwrap(), "localhost");
    }

    #[test]
    fn test_get_missing_key() {
        let map = sample_map();
        let err = map.get("MongoServer", "nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyNotFound);
        assert!(err.to_string().contains("MongoServer:nope"));

        let err = map.get("Missing", "address").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyNotFound);
    }

    #[test]
    fn test_get_int() {
        let map = sample_map();
        assert_eq!(map.get_int("MongoServer", "port").unwrap(), 27017);
    }

    #[test]
    fn test_get_int_rejects_non_integer() {
        let mut map = sample_map();
        map.insert("MongoServer", "port", "27017.5");
        let err = map.get_int("MongoServer", "port").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
        assert!(err.to_string().contains("MongoServer:port"));

        map.insert("MongoServer", "port", "0x10");
        assert!(map.get_int("MongoServer", "port").is_err());
    }

    #[test]
    fn test_get_bool() {
        let map = sample_map();
        assert!(!map.get_bool("SSHTunnel", "use_ssh_tunnel").unwrap());

        let mut map = sample_map();
        map.insert("SSHTunnel", "use_ssh_tunnel", "Yes");
        assert!(map.get_bool("SSHTunnel", "use_ssh_tunnel").unwrap());
    }

    #[test]
    fn test_get_as() {
        let map = sample_map();
        assert_eq!(
            map.get_as("MongoServer", "port", ValueType::Int).unwrap(),
            ConfigValue::Int(27017)
        );
        assert_eq!(
            map.get_as("MongoServer", "port", ValueType::String).unwrap(),
            ConfigValue::String("27017".to_string())
        );
        assert_eq!(
            map.get_as("SSHTunnel", "use_ssh_tunnel", ValueType::Bool)
                .unwrap(),
            ConfigValue::Bool(false)
        );
    }

    #[test]
    fn test_insert_lowercases_option_names() {
        let mut map = ConfigMap::new();
        map.insert("MongoClient", "serverSelectionTimeoutMS", "5000");
        assert!(map.contains("MongoClient", "serverselectiontimeoutms"));
        assert!(!map.contains("MongoClient", "serverSelectionTimeoutMS"));
    }

    #[test]
    fn test_from_sections_stringifies_values() {
        let map = ConfigMap::from_sections([("SSHTunnel", vec![("ssh_port", 22)])]);
        assert_eq!(map.get("SSHTunnel", "ssh_port").unwrap(), "22");
    }

    #[test]
    fn test_from_sections_keeps_empty_sections() {
        let map = ConfigMap::from_sections([("Empty", Vec::<(&str, &str)>::new())]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.sections().collect::<Vec<_>>(), vec!["Empty"]);
    }

    #[test]
    fn test_serializes_as_nested_object() {
        let json = serde_json::to_value(sample_map()).unwrap();
        assert_eq!(json["MongoServer"]["port"], "27017");
    }
}

mod parse_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_sections_and_options() {
        let map = parse_config(
            "[MongoServer]\naddress = db.example.com\nport = 27018\n\n[MongoClient]\nserverSelectionTimeoutMS = 5000\n",
            "inline",
        )
        .unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("MongoServer", "address").unwrap(), "db.example.com");
        assert_eq!(map.get("MongoServer", "port").unwrap(), "27018");
        assert_eq!(
            map.get("MongoClient", "serverselectiontimeoutms").unwrap(),
            "5000"
        );
    }

    #[test]
    fn test_parse_keeps_section_case() {
        let map = parse_config("[MongoServer]\naddress = x\n", "inline").unwrap();
        assert!(map.section("MongoServer").is_some());
        assert!(map.section("mongoserver").is_none());
    }

    #[test]
    fn test_parse_ignores_comment_lines() {
        let map = parse_config(
            "; leading comment\n[SSHTunnel]\n# another\nssh_host = bastion\n",
            "inline",
        )
        .unwrap();
        assert_eq!(map.get("SSHTunnel", "ssh_host").unwrap(), "bastion");
        assert_eq!(map.section("SSHTunnel").unwrap().len(), 1);
    }

    #[test]
    fn test_parse_keeps_comment_characters_inside_values() {
        let map = parse_config(
            "[SSHTunnel]\nssh_key_file = /keys/team#2/id_rsa\nssh_username = ops;admin\nnote = a ; b # c\n",
            "inline",
        )
        .unwrap();

        assert_eq!(map.get("SSHTunnel", "ssh_key_file").unwrap(), "/keys/team#2/id_rsa");
        assert_eq!(map.get("SSHTunnel", "ssh_username").unwrap(), "ops;admin");
        assert_eq!(map.get("SSHTunnel", "note").unwrap(), "a ; b # c");
    }

    #[test]
    fn test_parse_default_section_is_inherited() {
        let map = parse_config(
            "[DEFAULT]\nport = 27017\n[A]\naddress = a\n[B]\naddress = b\nport = 1\n",
            "inline",
        )
        .unwrap();

        assert_eq!(map.sections().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(map.get("A", "port").unwrap(), "27017");
        assert_eq!(map.get("B", "port").unwrap(), "1");
    }

    #[test]
    fn test_parse_zero_sections_fails() {
        let err = parse_config("", "empty").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
        assert!(err.to_string().contains("no sections"));

        let err = parse_config("; only a comment\n", "comment-only").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }
}

mod file_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_nonexistent_path() {
        let dir = tempdir().unwrap();
        let err = load_config(dir.path().join("missing.ini")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("missing.ini"));
    }

    #[test]
    fn test_load_zero_section_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.ini");
        std::fs::write(&path, "").unwrap();

        let err = load_config(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }

    #[test]
    fn test_write_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("database.ini");
        let map = sample_map();

        let written = write_config(&map, &path, false).unwrap();
        assert_eq!(written, path);

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded, map);
    }

    #[test]
    fn test_round_trip_keeps_comment_characters() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("database.ini");
        let map = ConfigMap::from_sections([(
            "SSHTunnel",
            vec![
                ("ssh_key_file", "/keys/team#2/id_rsa"),
                ("ssh_username", "ops;admin"),
                ("hash", "x # y"),
                ("semi", "a ; b"),
            ],
        )]);

        write_config(&map, &path, false).unwrap();
        assert_eq!(load_config(&path).unwrap(), map);
    }

    #[test]
    fn test_load_non_utf8_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bin.ini");
        std::fs::write(&path, [0xff, 0xfe, b'[', b'a', b']']).unwrap();

        let err = load_config(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
        assert!(err.to_string().contains("bin.ini"));
    }

    #[test]
    fn test_write_refuses_default_section() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("database.ini");
        let map = ConfigMap::from_sections([
            (DEFAULT_SECTION, vec![("a", "1")]),
            ("S", vec![("b", "2")]),
        ]);

        let err = write_config(&map, &path, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReservedSection);
        assert!(!path.exists());
    }

    #[test]
    fn test_write_refuses_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("database.ini");
        std::fs::write(&path, "[Keep]\nme = 1\n").unwrap();

        let err = write_config(&sample_map(), &path, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[Keep]\nme = 1\n"
        );

        write_config(&sample_map(), &path, true).unwrap();
        assert_eq!(load_config(&path).unwrap(), sample_map());
    }

    #[test]
    fn test_write_to_directory_fails() {
        let dir = tempdir().unwrap();
        let err = write_config(&sample_map(), dir.path(), true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathIsDirectory);
    }

    #[test]
    fn test_write_missing_parent_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no").join("such").join("database.ini");

        let err = write_config(&sample_map(), &path, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingParentDirectory);
        assert!(!dir.path().join("no").exists());
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/.database.ini");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with(".database.ini"));

        assert_eq!(expand_path("relative.ini"), PathBuf::from("relative.ini"));
    }

    #[test]
    fn test_discover_returns_first_loadable() {
        let dir = tempdir().unwrap();
        let broken = dir.path().join("broken.ini");
        let good = dir.path().join("good.ini");
        let later = dir.path().join("later.ini");
        std::fs::write(&broken, "").unwrap();
        write_config(&sample_map(), &good, false).unwrap();
        write_config(&ConfigMap::from_sections([("Other", vec![("a", "b")])]), &later, false)
            .unwrap();

        let candidates = [dir.path().join("absent.ini"), broken, good.clone(), later];
        let found = discover_config(&candidates).unwrap();
        assert_eq!(found.path, good);
        assert_eq!(found.config, sample_map());
    }

    #[test]
    fn test_discover_none_loadable() {
        let dir = tempdir().unwrap();
        let candidates = [dir.path().join("a.ini"), dir.path().join("b.ini")];
        assert!(discover_config(&candidates).is_none());
    }
}

mod store_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_store_without_path() {
        let mut store = ConfigStore::without_path();
        assert_eq!(store.load(None).unwrap_err().kind(), ErrorKind::NoPathProvided);
        assert_eq!(
            store.write(&sample_map(), None, false).unwrap_err().kind(),
            ErrorKind::NoPathProvided
        );
    }

    #[test]
    fn test_store_default_filename() {
        let store = ConfigStore::default();
        assert_eq!(store.path(), Some(Path::new(DEFAULT_CONFIG_FILENAME)));
    }

    #[test]
    fn test_store_write_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".foilmongo");
        let mut store = ConfigStore::new(&path);

        store.write(&sample_map(), None, false).unwrap();
        assert_eq!(store.load(None).unwrap(), sample_map());
    }

    #[test]
    fn test_store_explicit_path_is_remembered() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("explicit.ini");
        write_config(&sample_map(), &path, false).unwrap();

        let mut store = ConfigStore::without_path();
        store.load(Some(&path)).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
    }
}
