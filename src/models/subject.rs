use serde::{Deserialize, Serialize};

/// 科目枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    /// 几何
    Geometry,
    /// 数学
    Math,
    /// 生物
    Biology,
    /// 物理
    Physics,
    /// 化学
    Chemistry,
}

impl Subject {
    /// 存储和传输用的标识
    pub fn as_str(self) -> &'static str {
        match self {
            Subject::Geometry => "geometry",
            Subject::Math => "math",
            Subject::Biology => "biology",
            Subject::Physics => "physics",
            Subject::Chemistry => "chemistry",
        }
    }

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            Subject::Geometry => "Geometry",
            Subject::Math => "Math",
            Subject::Biology => "Biology",
            Subject::Physics => "Physics",
            Subject::Chemistry => "Chemistry",
        }
    }

    /// 尝试从字符串解析科目（精确匹配）
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "geometry" => Some(Subject::Geometry),
            "math" => Some(Subject::Math),
            "biology" => Some(Subject::Biology),
            "physics" => Some(Subject::Physics),
            "chemistry" => Some(Subject::Chemistry),
            _ => None,
        }
    }

    /// 智能查找科目（忽略大小写和首尾空白，支持常见别名）
    pub fn find(s: &str) -> Option<Self> {
        let s_lower = s.trim().to_lowercase();
        if let Some(subject) = Self::from_str(&s_lower) {
            return Some(subject);
        }

        match s_lower.as_str() {
            "maths" | "mathematics" | "algebra" => Some(Subject::Math),
            "bio" => Some(Subject::Biology),
            "chem" => Some(Subject::Chemistry),
            "phys" => Some(Subject::Physics),
            _ => None,
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 表单中的科目：空字符串表示尚未选择
pub(crate) fn deserialize_optional_subject<'de, D>(
    deserializer: D,
) -> Result<Option<Subject>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct SubjectVisitor;

    impl<'de> Visitor<'de> for SubjectVisitor {
        type Value = Option<Subject>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a subject name, an empty string or null")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if value.trim().is_empty() {
                return Ok(None);
            }
            Subject::find(value)
                .map(Some)
                .ok_or_else(|| E::custom(format!("unknown subject: {}", value)))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            deserializer.deserialize_str(self)
        }
    }

    deserializer.deserialize_option(SubjectVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Form {
        #[serde(default, deserialize_with = "deserialize_optional_subject")]
        subject: Option<Subject>,
    }

    #[test]
    fn test_find_accepts_aliases() {
        assert_eq!(Subject::find(" Physics "), Some(Subject::Physics));
        assert_eq!(Subject::find("maths"), Some(Subject::Math));
        assert_eq!(Subject::find("history"), None);
    }

    #[test]
    fn test_empty_subject_is_unselected() {
        let form: Form = serde_json::from_str(r#"{"subject": ""}"#).unwrap();
        assert_eq!(form.subject, None);

        let form: Form = serde_json::from_str(r#"{"subject": null}"#).unwrap();
        assert_eq!(form.subject, None);

        let form: Form = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(form.subject, None);

        let form: Form = serde_json::from_str(r#"{"subject": "chemistry"}"#).unwrap();
        assert_eq!(form.subject, Some(Subject::Chemistry));
    }

    #[test]
    fn test_unknown_subject_is_rejected() {
        assert!(serde_json::from_str::<Form>(r#"{"subject": "history"}"#).is_err());
    }
}
