//! Customer input record collected by the form

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorical columns fed to the one-hot encoder, in encoder order.
pub const CATEGORICAL_COLUMNS: [&str; 6] = ["job", "marital", "education", "contact", "month", "poutcome"];

macro_rules! categorical {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $value:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            /// Every value of the domain, in form display order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The category string the encoder was fitted on.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

categorical! {
    /// Type of job
    Job {
        Management => "management",
        Technician => "technician",
        Entrepreneur => "entrepreneur",
        BlueCollar => "blue-collar",
        Unknown => "unknown",
        Retired => "retired",
        Admin => "admin.",
        Services => "services",
        SelfEmployed => "self-employed",
        Unemployed => "unemployed",
        Housemaid => "housemaid",
        Student => "student",
    }
}

categorical! {
    /// Marital status
    Marital {
        Divorced => "divorced",
        Married => "married",
        Single => "single",
    }
}

categorical! {
    Education {
        Primary => "primary",
        Secondary => "secondary",
        Tertiary => "tertiary",
        Unknown => "unknown",
    }
}

categorical! {
    /// Contact communication type
    Contact {
        Cellular => "cellular",
        Telephone => "telephone",
        Unknown => "unknown",
    }
}

categorical! {
    /// Last contact month of year
    Month {
        Jan => "jan",
        Feb => "feb",
        Mar => "mar",
        Apr => "apr",
        May => "may",
        Jun => "jun",
        Jul => "jul",
        Aug => "aug",
        Sep => "sep",
        Oct => "oct",
        Nov => "nov",
        Dec => "dec",
    }
}

categorical! {
    /// Outcome of the previous marketing campaign
    Poutcome {
        Failure => "failure",
        Unknown => "unknown",
        Success => "success",
        Other => "other",
    }
}

categorical! {
    /// Answer to a yes/no question
    YesNo {
        No => "no",
        Yes => "yes",
    }
}

impl YesNo {
    /// Training-time encoding: yes -> 1, no -> 0
    pub fn as_flag(self) -> u8 {
        match self {
            YesNo::Yes => 1,
            YesNo::No => 0,
        }
    }
}

/// Non-categorical columns passed to the classifier untouched, in
/// training-frame order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericColumn {
    Age,
    Default,
    Balance,
    Housing,
    Loan,
    Day,
    Campaign,
    Pdays,
    Previous,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 9] = [
        NumericColumn::Age,
        NumericColumn::Default,
        NumericColumn::Balance,
        NumericColumn::Housing,
        NumericColumn::Loan,
        NumericColumn::Day,
        NumericColumn::Campaign,
        NumericColumn::Pdays,
        NumericColumn::Previous,
    ];

    /// Column name in the trained feature list
    pub fn name(self) -> &'static str {
        match self {
            NumericColumn::Age => "age",
            NumericColumn::Default => "default",
            NumericColumn::Balance => "balance",
            NumericColumn::Housing => "housing",
            NumericColumn::Loan => "loan",
            NumericColumn::Day => "day",
            NumericColumn::Campaign => "campaign",
            NumericColumn::Pdays => "pdays",
            NumericColumn::Previous => "previous",
        }
    }
}

/// One customer's raw answers.
///
/// Enum domains are enforced by the types; numeric ranges are checked by
/// [`InputRecord::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Age in years
    pub age: i32,
    pub job: Job,
    pub marital: Marital,
    pub education: Education,
    /// Has credit in default?
    pub default: YesNo,
    /// Average yearly balance
    pub balance: f64,
    /// Has housing loan?
    pub housing: YesNo,
    /// Has personal loan?
    pub loan: YesNo,
    pub contact: Contact,
    /// Last contact day of the month (1-31)
    pub day: i32,
    pub month: Month,
    /// Contacts performed during this campaign (>= 1)
    pub campaign: i32,
    /// Days since the client was last contacted by a previous campaign
    /// (-1 = never contacted)
    pub pdays: i32,
    /// Contacts performed before this campaign (>= 0)
    pub previous: i32,
    pub poutcome: Poutcome,
}

impl InputRecord {
    /// Check numeric ranges the form enforces.
    pub fn validate(&self) -> Result<(), ValidationError> {
        fn check(ok: bool, field: &'static str, rule: &'static str, value: impl ToString) -> Result<(), ValidationError> {
            if ok {
                Ok(())
            } else {
                Err(ValidationError {
                    field,
                    rule,
                    value: value.to_string(),
                })
            }
        }

        check(self.age >= 0, "age", "at least 0", self.age)?;
        check(self.balance.is_finite(), "balance", "a finite number", self.balance)?;
        check((1..=31).contains(&self.day), "day", "between 1 and 31", self.day)?;
        check(self.campaign >= 1, "campaign", "at least 1", self.campaign)?;
        check(self.pdays >= -1, "pdays", "at least -1", self.pdays)?;
        check(self.previous >= 0, "previous", "at least 0", self.previous)?;
        Ok(())
    }

    /// Categorical values in [`CATEGORICAL_COLUMNS`] order.
    pub fn categorical_values(&self) -> [&'static str; 6] {
        [
            self.job.as_str(),
            self.marital.as_str(),
            self.education.as_str(),
            self.contact.as_str(),
            self.month.as_str(),
            self.poutcome.as_str(),
        ]
    }

    /// Value of a non-categorical column, with yes/no answers coerced to 0/1.
    pub fn numeric_value(&self, column: NumericColumn) -> f32 {
        match column {
            NumericColumn::Age => self.age as f32,
            NumericColumn::Default => self.default.as_flag() as f32,
            NumericColumn::Balance => self.balance as f32,
            NumericColumn::Housing => self.housing.as_flag() as f32,
            NumericColumn::Loan => self.loan.as_flag() as f32,
            NumericColumn::Day => self.day as f32,
            NumericColumn::Campaign => self.campaign as f32,
            NumericColumn::Pdays => self.pdays as f32,
            NumericColumn::Previous => self.previous as f32,
        }
    }
}

impl Default for InputRecord {
    /// The form's initial values.
    fn default() -> Self {
        Self {
            age: 40,
            job: Job::Management,
            marital: Marital::Married,
            education: Education::Tertiary,
            default: YesNo::No,
            balance: 2000.0,
            housing: YesNo::No,
            loan: YesNo::No,
            contact: Contact::Cellular,
            day: 15,
            month: Month::May,
            campaign: 3,
            pdays: -1,
            previous: 0,
            poutcome: Poutcome::Unknown,
        }
    }
}
