//! # Schema Descriptor
//!
//! A static description of the invoice database the model writes SQL against.
//! Names are used verbatim (and case-sensitively) in generated SQL, so they must
//! match the live database exactly. The descriptor is never mutated at runtime.

use std::fmt;

/// The logical column types as presented to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    DateTime,
    Float,
    Integer,
    Boolean,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::String => "String",
            ColumnType::DateTime => "DateTime",
            ColumnType::Float => "Float",
            ColumnType::Integer => "Int",
            ColumnType::Boolean => "Boolean",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub r#type: ColumnType,
    pub nullable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    ManyToOne,
    OneToOne,
}

/// A foreign key from a column of the owning table to `ref_table.ref_column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub ref_table: &'static str,
    pub ref_column: &'static str,
    pub cardinality: Cardinality,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    /// The short alias the prompt asks the model to use for this table.
    pub alias: &'static str,
    pub columns: &'static [Column],
    pub foreign_keys: &'static [ForeignKey],
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// The ordered set of tables the model may query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub tables: &'static [Table],
}

impl SchemaDescriptor {
    /// Looks up a table by its exact, case-sensitive name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Renders the tables section of the prompt, one line per table.
    ///
    /// e.g. `- Invoice (id: String, ..., customerName: String (nullable), vendorId: String)`
    pub fn render_tables(&self) -> String {
        self.tables
            .iter()
            .map(|table| {
                let columns = table
                    .columns
                    .iter()
                    .map(|c| {
                        if c.nullable {
                            format!("{}: {} (nullable)", c.name, c.r#type)
                        } else {
                            format!("{}: {}", c.name, c.r#type)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("- {} ({columns})", table.name)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Renders the relations section of the prompt, one line per foreign key.
    pub fn render_relations(&self) -> String {
        self.tables
            .iter()
            .flat_map(|table| {
                table.foreign_keys.iter().map(move |fk| {
                    let suffix = match fk.cardinality {
                        Cardinality::OneToOne => " (one-to-one)",
                        Cardinality::ManyToOne => "",
                    };
                    format!(
                        "- {}.{} references {}.{}{suffix}",
                        table.name, fk.column, fk.ref_table, fk.ref_column
                    )
                })
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Renders the alias rule, e.g. `V for Vendor, I for Invoice, ...`.
    pub fn render_aliases(&self) -> String {
        let aliases: Vec<String> = self
            .tables
            .iter()
            .map(|t| format!("{} for {}", t.alias, t.name))
            .collect();
        match aliases.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{}, and {last}", rest.join(", ")),
            Some((last, _)) => last.clone(),
            None => String::new(),
        }
    }
}

impl fmt::Display for SchemaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tables:\n\n{}\n\nRelations:\n\n{}",
            self.render_tables(),
            self.render_relations()
        )
    }
}

const fn col(name: &'static str, r#type: ColumnType) -> Column {
    Column {
        name,
        r#type,
        nullable: false,
    }
}

const fn nullable(name: &'static str, r#type: ColumnType) -> Column {
    Column {
        name,
        r#type,
        nullable: true,
    }
}

const TABLES: &[Table] = &[
    Table {
        name: "Vendor",
        alias: "V",
        columns: &[col("id", ColumnType::String), col("name", ColumnType::String)],
        foreign_keys: &[],
    },
    Table {
        name: "Invoice",
        alias: "I",
        columns: &[
            col("id", ColumnType::String),
            col("invoiceNumber", ColumnType::String),
            col("date", ColumnType::DateTime),
            col("amount", ColumnType::Float),
            col("status", ColumnType::String),
            nullable("customerName", ColumnType::String),
            col("vendorId", ColumnType::String),
        ],
        foreign_keys: &[ForeignKey {
            column: "vendorId",
            ref_table: "Vendor",
            ref_column: "id",
            cardinality: Cardinality::ManyToOne,
        }],
    },
    Table {
        name: "LineItem",
        alias: "L",
        columns: &[
            col("id", ColumnType::String),
            col("description", ColumnType::String),
            col("quantity", ColumnType::Float),
            col("unitPrice", ColumnType::Float),
            col("totalPrice", ColumnType::Float),
            nullable("category", ColumnType::String),
            col("invoiceId", ColumnType::String),
        ],
        foreign_keys: &[ForeignKey {
            column: "invoiceId",
            ref_table: "Invoice",
            ref_column: "id",
            cardinality: Cardinality::ManyToOne,
        }],
    },
    Table {
        name: "Payment",
        alias: "P",
        columns: &[
            col("id", ColumnType::String),
            nullable("date", ColumnType::DateTime),
            col("amount", ColumnType::Float),
            col("invoiceId", ColumnType::String),
        ],
        foreign_keys: &[ForeignKey {
            column: "invoiceId",
            ref_table: "Invoice",
            ref_column: "id",
            cardinality: Cardinality::OneToOne,
        }],
    },
];

/// The process-wide invoice schema.
pub static INVOICE_SCHEMA: SchemaDescriptor = SchemaDescriptor { tables: TABLES };
