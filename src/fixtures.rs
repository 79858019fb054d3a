#[cfg(test)]
pub mod test {
    use serde::{Deserialize, Serialize};

    use crate::codec::SelfCodec;
    use crate::error::BoxError;
    use crate::model::ConfigModel;

    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    #[serde(default)]
    pub struct TestConfig {
        pub word: String,
        pub num: i32,
    }

    impl ConfigModel for TestConfig {}

    #[test]
    fn test_config_defaults() {
        let config = TestConfig::default();
        assert_eq!(config.word, "");
        assert_eq!(config.num, 0);
    }

    // -- Fixture for lifecycle hook tests ---------------------------------------

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    #[serde(default)]
    pub struct InitConfig {
        pub number: i32,
    }

    impl Default for InitConfig {
        fn default() -> Self {
            Self { number: 9 }
        }
    }

    impl ConfigModel for InitConfig {
        fn init(&mut self) -> Result<(), BoxError> {
            self.number += 1;
            Ok(())
        }
    }

    // -- Fixture for codec customization tests ----------------------------------

    #[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
    #[serde(default)]
    pub struct CustomizedConfig {
        pub label: String,
        pub values: Vec<u32>,
    }

    impl ConfigModel for CustomizedConfig {}

    // -- Fixture for self-encoding models ---------------------------------------

    /// Stored as `value=<n>` instead of JSON.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct SelfEncodedConfig {
        pub value: i64,
    }

    impl ConfigModel for SelfEncodedConfig {}

    impl SelfCodec for SelfEncodedConfig {
        fn encode(&self) -> Result<String, BoxError> {
            Ok(format!("value={}", self.value))
        }

        fn decode(text: &str) -> Result<Self, BoxError> {
            let raw = text
                .trim()
                .strip_prefix("value=")
                .ok_or("expected 'value=<n>'")?;
            Ok(Self {
                value: raw.parse()?,
            })
        }
    }

    #[test]
    fn self_encoded_round_trip() {
        let config = SelfEncodedConfig { value: -42 };
        let text = config.encode().unwrap();
        assert_eq!(text, "value=-42");
        assert_eq!(SelfEncodedConfig::decode(&text).unwrap(), config);
        assert!(SelfEncodedConfig::decode("{}").is_err());
    }
}
