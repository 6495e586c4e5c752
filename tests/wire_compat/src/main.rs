fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use courier_protocol::Envelope;
    use serde::Deserialize;
    use serde_json::Value;

    /// A frame as the message server emits it and the envelope listeners
    /// must receive for it.
    #[derive(Deserialize)]
    struct Case {
        /// A string is used as the frame text verbatim; any other value is
        /// serialized first.
        frame: Value,
        expected: Value,
    }

    impl Case {
        fn frame_text(&self) -> String {
            match &self.frame {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            }
        }
    }

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn load_case(path: &Path) -> Case {
        let data = fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    fn all_cases() -> Vec<(String, Case)> {
        let mut paths: Vec<PathBuf> = fs::read_dir(fixtures_dir())
            .expect("fixtures directory")
            .map(|entry| entry.expect("fixture entry").path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        paths
            .into_iter()
            .map(|p| {
                let name = p.file_name().unwrap().to_string_lossy().into_owned();
                let case = load_case(&p);
                (name, case)
            })
            .collect()
    }

    fn normalize(name: &str) -> Value {
        let case = load_case(&fixtures_dir().join(name));
        serde_json::to_value(Envelope::from_frame(&case.frame_text())).unwrap()
    }

    #[test]
    fn every_fixture_normalizes_as_expected() {
        let cases = all_cases();
        assert!(!cases.is_empty(), "no fixtures found");
        for (name, case) in cases {
            let envelope = Envelope::from_frame(&case.frame_text());
            let actual = serde_json::to_value(&envelope)
                .unwrap_or_else(|e| panic!("failed to serialize {name}: {e}"));
            assert_eq!(actual, case.expected, "fixture {name} normalized differently");
        }
    }

    #[test]
    fn normalized_fixtures_are_stable() {
        for (name, case) in all_cases() {
            let once = Envelope::from_frame(&case.frame_text());
            let twice = Envelope::from_frame(&once.to_json().unwrap());
            assert_eq!(once, twice, "fixture {name} changed on second pass");
        }
    }

    #[test]
    fn server_message_keeps_legacy_fields() {
        let value = normalize("server_message.json");
        assert_eq!(value["data"]["sender_id"], 12);
        assert_eq!(value["data"]["senderId"], 12);
        assert_eq!(value["data"]["recipientId"], 40);
        assert_eq!(value["data"]["product_id"], 87);
    }

    #[test]
    fn server_pong_is_delivered_as_raw() {
        let value = normalize("server_pong.json");
        assert_eq!(value["type"], "raw");
        assert_eq!(value["data"]["content"], "pong");
    }

    #[test]
    fn flat_ids_survive_at_top_level() {
        let value = normalize("typed_with_flat_ids.json");
        assert_eq!(value["sender_id"], 7);
        assert_eq!(value["timestamp"], 1_714_612_443_512_i64);
        let envelope: Envelope = serde_json::from_value(value).unwrap();
        assert_eq!(envelope.timestamp_ms(), Some(1_714_612_443_512));
    }
}
