use super::Value;
use std::collections::HashMap;

/// Presentation of one decoded value, chosen by variable name
pub trait ValueFormatter: Send + Sync {
    /// `None` falls back to the generic rendering
    fn format(&self, value: &Value) -> Option<String>;
}

/// Renders a byte array as NUL padded text
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormatter;

impl ValueFormatter for TextFormatter {
    fn format(&self, value: &Value) -> Option<String> {
        let Value::UInt8(bytes) = value else {
            return None;
        };
        let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}

impl<F: Fn(&Value) -> Option<String> + Send + Sync> ValueFormatter for F {
    fn format(&self, value: &Value) -> Option<String> {
        self(value)
    }
}

/// Name-keyed formatting layered over the generic value rendering
pub struct Overlay {
    formatters: HashMap<String, Box<dyn ValueFormatter>>,
}

impl Default for Overlay {
    fn default() -> Self {
        let mut overlay = Self::empty();
        overlay.register("personalName", TextFormatter);
        overlay
    }
}

impl std::fmt::Debug for Overlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.formatters.keys()).finish()
    }
}

impl Overlay {
    /// Overlay without any special cases
    pub fn empty() -> Self {
        Self {
            formatters: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        formatter: impl ValueFormatter + 'static,
    ) -> &mut Self {
        self.formatters.insert(name.into(), Box::new(formatter));
        self
    }

    pub fn format(&self, name: &str, value: &Value) -> String {
        self.formatters
            .get(name)
            .and_then(|formatter| formatter.format(value))
            .unwrap_or_else(|| value.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_personal_name() {
        let overlay = Overlay::default();
        let name = Value::UInt8(b"Snake\0\0\0".to_vec());
        assert_eq!(overlay.format("personalName", &name), "Snake");
        // other byte arrays stay numeric
        assert_eq!(
            overlay.format("missionFlags", &Value::UInt8(vec![83, 0])),
            "[83, 0]"
        );
        // a mistyped value falls back to the generic rendering
        assert_eq!(
            overlay.format("personalName", &Value::UInt16(vec![1])),
            "[1]"
        );
    }

    #[test]
    fn test_empty_and_custom() {
        let mut overlay = Overlay::empty();
        let name = Value::UInt8(vec![0x41, 0]);
        assert_eq!(overlay.format("personalName", &name), "[65, 0]");

        overlay.register("gmp", |value: &Value| match value {
            Value::UInt32(v) => Some(format!("{} GMP", v.iter().sum::<u32>())),
            _ => None,
        });
        assert_eq!(
            overlay.format("gmp", &Value::UInt32(vec![1000, 500])),
            "1500 GMP"
        );
        assert_eq!(TextFormatter.format(&Value::UInt8(vec![0, 0])), Some(String::new()));
    }
}
