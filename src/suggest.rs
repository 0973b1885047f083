//! Mapping Suggestions
//!
//! 플레이스홀더 → 컬럼 추천 기능의 인터페이스입니다. 추천은 사용자가 수락할 수 있는
//! 힌트일 뿐이며 매핑 빌더의 정확성은 추천에 의존하지 않습니다.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DocgenError;

/// 추천 결과 한 건
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub placeholder: String,
    pub column: String,
    /// 0.0 ~ 1.0
    pub confidence: f64,
}

/// 추천 서비스 (외부 AI 서비스 등)
#[async_trait]
pub trait MappingSuggester: Send + Sync {
    async fn suggest(
        &self,
        placeholders: &[String],
        columns: &[String],
    ) -> Result<Vec<Suggestion>, DocgenError>;
}

/// 이름 정규화 기반 로컬 추천기
///
/// 대소문자, 공백, `_`, `-`를 무시하고 비교합니다. 정규화된 이름이 같으면 0.9,
/// 한쪽이 다른 쪽을 포함하면 0.6의 신뢰도를 부여합니다.
#[derive(Debug, Default, Clone, Copy)]
pub struct NameSimilaritySuggester;

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[async_trait]
impl MappingSuggester for NameSimilaritySuggester {
    async fn suggest(
        &self,
        placeholders: &[String],
        columns: &[String],
    ) -> Result<Vec<Suggestion>, DocgenError> {
        let normalized_columns: Vec<(String, &String)> =
            columns.iter().map(|c| (normalize(c), c)).collect();

        let mut out = Vec::new();
        for placeholder in placeholders {
            let key = normalize(placeholder);
            if key.is_empty() {
                continue;
            }

            let best = normalized_columns
                .iter()
                .filter(|(norm, _)| !norm.is_empty())
                .filter_map(|(norm, column)| {
                    if *norm == key {
                        Some((0.9, *column))
                    } else if norm.contains(&key) || key.contains(norm.as_str()) {
                        Some((0.6, *column))
                    } else {
                        None
                    }
                })
                .fold(None::<(f64, &String)>, |best, candidate| match best {
                    Some(b) if b.0 >= candidate.0 => Some(b),
                    _ => Some(candidate),
                });

            if let Some((confidence, column)) = best {
                out.push(Suggestion {
                    placeholder: placeholder.clone(),
                    column: column.clone(),
                    confidence,
                });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_name_similarity_prefers_exact_normalized_match() {
        let suggestions = NameSimilaritySuggester
            .suggest(
                &strings(&["FirstName", "HireDate", "Salary"]),
                &strings(&["employee_first_name", "first_name", "hire date", "role"]),
            )
            .await
            .unwrap();

        assert_eq!(
            suggestions,
            vec![
                Suggestion {
                    placeholder: "FirstName".into(),
                    column: "first_name".into(),
                    confidence: 0.9,
                },
                Suggestion {
                    placeholder: "HireDate".into(),
                    column: "hire date".into(),
                    confidence: 0.9,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_containment_match_has_lower_confidence() {
        let suggestions = NameSimilaritySuggester
            .suggest(&strings(&["LastName"]), &strings(&["employee_last_name"]))
            .await
            .unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].confidence, 0.6);
    }
}
