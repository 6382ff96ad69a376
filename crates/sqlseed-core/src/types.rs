use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Declared column type metadata as reported by the source engine.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ColumnType {
    /// Declared type, optionally with arguments (e.g. `varchar(255)`, `tinyint(1)`).
    pub data_type: String,
    #[serde(default)]
    pub character_max_length: Option<i32>,
    #[serde(default)]
    pub numeric_precision: Option<i32>,
    #[serde(default)]
    pub numeric_scale: Option<i32>,
}

impl ColumnType {
    /// Lowercased base type name without arguments.
    pub fn base_name(&self) -> String {
        self.data_type
            .split('(')
            .next()
            .unwrap_or(&self.data_type)
            .trim()
            .to_lowercase()
    }

    /// Numeric arguments of the declared type, e.g. `(10,2)` → `[10, 2]`.
    fn type_args(&self) -> Vec<i32> {
        let Some(start) = self.data_type.find('(') else {
            return Vec::new();
        };
        let end = self.data_type.rfind(')').unwrap_or(self.data_type.len());
        if end <= start {
            return Vec::new();
        }
        self.data_type[start + 1..end]
            .split(',')
            .filter_map(|part| part.trim().parse::<i32>().ok())
            .collect()
    }

    /// Effective precision, from metadata or the declared type arguments.
    pub fn precision(&self) -> Option<i32> {
        self.numeric_precision
            .or_else(|| self.type_args().first().copied())
    }

    /// Effective scale, from metadata or the declared type arguments.
    pub fn scale(&self) -> Option<i32> {
        self.numeric_scale.or_else(|| {
            let args = self.type_args();
            if args.len() >= 2 { Some(args[1]) } else { None }
        })
    }

    /// Effective maximum character length.
    pub fn max_length(&self) -> Option<usize> {
        let declared = self.character_max_length.or_else(|| {
            if matches!(self.kind(), DataKind::Text) {
                self.type_args().first().copied()
            } else {
                None
            }
        });
        declared.filter(|len| *len > 0).map(|len| len as usize)
    }

    /// Classify the declared type into the value families the generator knows.
    pub fn kind(&self) -> DataKind {
        let base = self.base_name();
        let args = self.type_args();
        match base.as_str() {
            "bool" | "boolean" => DataKind::Boolean,
            "bit" if args.first().copied().unwrap_or(1) == 1 => DataKind::Boolean,
            "tinyint" if args.first() == Some(&1) => DataKind::Boolean,
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" | "int2"
            | "int4" | "int8" | "serial" | "bigserial" | "smallserial" | "pls_integer" => {
                DataKind::Integer
            }
            "number" | "numeric" | "decimal" | "dec" => {
                if self.scale().unwrap_or(0) > 0 {
                    DataKind::Decimal
                } else {
                    DataKind::Integer
                }
            }
            "float" | "double" | "double precision" | "real" | "float4" | "float8"
            | "binary_float" | "binary_double" => DataKind::Float,
            "date" => DataKind::Date,
            "time" | "time with time zone" | "time without time zone" | "timetz" => DataKind::Time,
            "datetime" | "datetime2" | "timestamp" | "timestamptz" | "timestamp with time zone"
            | "timestamp without time zone" | "timestamp with local time zone" => {
                DataKind::Timestamp
            }
            "uuid" | "uniqueidentifier" => DataKind::Uuid,
            "json" | "jsonb" => DataKind::Json,
            _ => DataKind::Text,
        }
    }
}

/// Value family of a column, derived from its declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Integer,
    Decimal,
    Float,
    Boolean,
    Date,
    Time,
    Timestamp,
    Uuid,
    Json,
    Text,
}

impl DataKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, DataKind::Integer | DataKind::Decimal | DataKind::Float)
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, DataKind::Date | DataKind::Timestamp)
    }
}

/// Identity generation strategy for columns using `GENERATED ... AS IDENTITY`
/// or auto-increment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IdentityGeneration {
    Always,
    ByDefault,
    AutoIncrement,
}

/// Kind of generated column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GeneratedKind {
    Stored,
    Virtual,
}

/// Information about generated column expressions.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedExpression {
    pub kind: GeneratedKind,
    #[serde(default)]
    pub expression: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(data_type: &str) -> ColumnType {
        ColumnType {
            data_type: data_type.to_string(),
            character_max_length: None,
            numeric_precision: None,
            numeric_scale: None,
        }
    }

    #[test]
    fn classifies_mysql_and_oracle_types() {
        assert_eq!(ty("tinyint(1)").kind(), DataKind::Boolean);
        assert_eq!(ty("tinyint(4)").kind(), DataKind::Integer);
        assert_eq!(ty("NUMBER(10,2)").kind(), DataKind::Decimal);
        assert_eq!(ty("NUMBER(10)").kind(), DataKind::Integer);
        assert_eq!(ty("VARCHAR2(40)").kind(), DataKind::Text);
        assert_eq!(ty("datetime").kind(), DataKind::Timestamp);
        assert_eq!(ty("timestamp with time zone").kind(), DataKind::Timestamp);
        assert_eq!(ty("jsonb").kind(), DataKind::Json);
    }

    #[test]
    fn max_length_falls_back_to_type_arguments() {
        assert_eq!(ty("varchar(12)").max_length(), Some(12));
        assert_eq!(ty("int(11)").max_length(), None);
        let mut declared = ty("text");
        declared.character_max_length = Some(30);
        assert_eq!(declared.max_length(), Some(30));
    }
}
