//! 设备过滤规则（OR of ANDs）。
//!
//! 规则集外层任一子句通过即通过，子句内所有规则都需匹配；空规则集放行所有设备。
//! 正则为非锚定搜索，匹配对象是字段的字符串值。

use domain::FilterRule;
use regex::Regex;
use std::collections::BTreeMap;

/// 过滤错误：属于配置错误，需上抛给调用方。
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("invalid regex for {parameter}: {message}")]
    InvalidRegex { parameter: String, message: String },
    #[error("field not available for filtering: {0}")]
    MissingField(String),
}

#[derive(Debug)]
struct CompiledRule {
    parameter: String,
    regex: Regex,
}

/// 预编译的规则集，同一批设备复用。
#[derive(Debug, Default)]
pub struct CompiledFilter {
    clauses: Vec<Vec<CompiledRule>>,
}

impl CompiledFilter {
    pub fn compile(rules: &[Vec<FilterRule>]) -> Result<Self, FilterError> {
        let mut clauses = Vec::with_capacity(rules.len());
        for clause in rules {
            let mut compiled = Vec::with_capacity(clause.len());
            for rule in clause {
                let regex = Regex::new(&rule.regex).map_err(|err| FilterError::InvalidRegex {
                    parameter: rule.parameter.clone(),
                    message: err.to_string(),
                })?;
                compiled.push(CompiledRule {
                    parameter: rule.parameter.clone(),
                    regex,
                });
            }
            clauses.push(compiled);
        }
        Ok(Self { clauses })
    }

    /// 判断字段集合是否通过过滤。
    pub fn matches(&self, fields: &BTreeMap<String, String>) -> Result<bool, FilterError> {
        if self.clauses.is_empty() {
            return Ok(true);
        }
        for clause in &self.clauses {
            if clause_matches(clause, fields)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn clause_matches(
    clause: &[CompiledRule],
    fields: &BTreeMap<String, String>,
) -> Result<bool, FilterError> {
    for rule in clause {
        let value = fields
            .get(&rule.parameter)
            .ok_or_else(|| FilterError::MissingField(rule.parameter.clone()))?;
        if !rule.regex.is_match(value) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// 一次性编译并判断。
pub fn adheres_to_filter(
    rules: &[Vec<FilterRule>],
    fields: &BTreeMap<String, String>,
) -> Result<bool, FilterError> {
    CompiledFilter::compile(rules)?.matches(fields)
}
