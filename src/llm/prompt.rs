//! Prompt template for English-to-SQL translation.

/// Build the chat prompt for one question against a schema description.
/// Deterministic: identical inputs produce the identical prompt.
pub fn build(question: &str, schema_summary: &str) -> String {
    let schema_block = if schema_summary.trim().is_empty() {
        "(no tables yet)"
    } else {
        schema_summary
    };
    format!(
        "You are an expert in converting English questions to SQL queries!\n\
         The database has the following tables and columns:\n\
         {schema_block}\n\
         \n\
         For example:\n\
         Example 1 - How many entries of records are present in STUDENT?\n\
         SQL: SELECT COUNT(*) FROM STUDENT;\n\
         Example 2 - Tell me all the students studying in Data Science COURSE?\n\
         SQL: SELECT * FROM STUDENT where COURSE=\"Data Science\";\n\
         \n\
         The SQL code should not have ``` at the beginning or end and no 'sql' word in the output.\n\
         Now convert the following question to a valid SQL query: {question}\n\
         No preamble, only valid SQL please."
    )
}

/// Strip a leading ```sql or ``` fence and a trailing ``` fence, then trim.
/// Models add them despite the instruction not to.
pub fn clean_sql(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = if let Some(rest) = trimmed.strip_prefix("```sql") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest
    } else {
        trimmed
    };
    inner.strip_suffix("```").unwrap_or(inner).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "- STUDENT: NAME (VARCHAR(25)), MARKS (INT)";

    #[test]
    fn test_build_embeds_question_and_schema() {
        let prompt = build("how many students?", SCHEMA);
        assert!(prompt.contains("how many students?"));
        assert!(prompt.contains(SCHEMA));
        assert!(prompt.contains("SELECT COUNT(*) FROM STUDENT;"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = build("list all marks", SCHEMA);
        let b = build("list all marks", SCHEMA);
        assert_eq!(a, b);
    }

    #[test]
    fn test_build_with_empty_schema() {
        let prompt = build("anything", "");
        assert!(prompt.contains("(no tables yet)"));
    }

    #[test]
    fn test_clean_sql_passes_plain_text_through() {
        assert_eq!(clean_sql("SELECT * FROM STUDENT"), "SELECT * FROM STUDENT");
        assert_eq!(clean_sql("  SELECT 1  \n"), "SELECT 1");
    }

    #[test]
    fn test_clean_sql_strips_sql_fence() {
        assert_eq!(
            clean_sql("```sql\nSELECT * FROM STUDENT\n```"),
            "SELECT * FROM STUDENT"
        );
    }

    #[test]
    fn test_clean_sql_strips_bare_fence() {
        assert_eq!(clean_sql("```\nSELECT 1\n```"), "SELECT 1");
    }

    #[test]
    fn test_clean_sql_keeps_inner_backticks() {
        // Only the outermost fence is removed
        assert_eq!(
            clean_sql("```sql\nSELECT '```' AS fence\n```"),
            "SELECT '```' AS fence"
        );
    }
}
