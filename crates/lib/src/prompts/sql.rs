//! # SQL Generation Templates
//!
//! The default prompt templates for turning a question into PostgreSQL.
//! Both can be replaced through the server configuration.

/// A worked query the system prompt shows the model: top vendors by spend.
pub const EXAMPLE_QUERY: &str = r#"SELECT
    V."name",
    SUM(L."totalPrice") AS total_spend
FROM
    "Vendor" V
JOIN
    "Invoice" I ON V."id" = I."vendorId"
JOIN
    "LineItem" L ON I."id" = L."invoiceId"
GROUP BY
    V."name"
ORDER BY
    total_spend DESC
LIMIT 5;"#;

/// The default system prompt.
///
/// Placeholders: `{schema}`, `{aliases}`, `{example}`
pub const SQL_GENERATION_SYSTEM_PROMPT: &str = r#"You are an expert SQL generator for PostgreSQL with the following schema:

{schema}

Rules:

- Always use **double quotes** around all table names and column names exactly as shown, preserving camelCase (e.g. "vendorId", "invoiceNumber").
- Use table aliases such as {aliases}.
- When referencing columns, always prefix with the table alias and a dot, for example: V."id", I."vendorId".
- Format the SQL with proper spacing and line breaks for readability.
- Return only the SQL query, no explanation or extra text.

Example:

```sql
{example}
```"#;

/// The default user prompt. The question is only ever interpolated here.
///
/// Placeholders: `{question}`
pub const SQL_GENERATION_USER_PROMPT: &str = "Generate a valid PostgreSQL SQL query for: {question}";
