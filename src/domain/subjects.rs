// Static subject catalog, in the order the subject picker shows it

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subject {
    pub id: &'static str,
    pub name: &'static str,
}

const fn subject(id: &'static str, name: &'static str) -> Subject {
    Subject { id, name }
}

pub const SUBJECTS: &[Subject] = &[
    subject("ST2016", "מתמטיקה"),
    subject("ST2021", "אנגלית"),
    subject("ST2012", "היסטוריה"),
    subject("ST2005", "תנ\"ך"),
    subject("ST2009", "לשון והבעה עברית"),
    subject("ST2013", "אזרחות"),
    subject("ST2019", "פיזיקה"),
    subject("ST2032", "ביולוגיה"),
    subject("ST2036", "כימיה"),
    subject("ST2017", "מדעי המחשב"),
    subject("ST2039", "חינוך גופני"),
    subject("ST2014", "גיאוגרפיה"),
    subject("ST2010", "סוציולוגיה ומדעי החברה"),
    subject("ST2037", "מדעי כדור הארץ והסביבה"),
    subject("ST2018", "מדעים וטכנולוגיה"),
    subject("ST2041", "ביו טכנולוגיה"),
    subject("ST2042", "חשמל, אלקטרוניקה"),
    subject("ST2046", "תעשייה וניהול"),
    subject("ST2043", "ניהול עסקי"),
    subject("ST2047", "טכנולוגיות מידע"),
    subject("ST2045", "טכנולוגיות תקשורת"),
    subject("ST2015", "תקשורת וקולנוע"),
    subject("ST2033", "פילוסופיה"),
    subject("ST2048", "פסיכולוגיה"),
    subject("ST2029", "אמנות חזותית"),
    subject("ST2027", "מוזיקה"),
    subject("ST2030", "מחול"),
    subject("ST2028", "תיאטרון"),
    subject("ST2031", "מכונות"),
    subject("ST2044", "מכונאות רכב ותחבורה"),
    subject("ST2020", "מדעי החקלאות"),
    subject("ST2034", "לימודי ארץ ישראל"),
    subject("ST2007", "מורשת ותרבות ישראל"),
    subject("ST2008", "מחשבת ישראל"),
    subject("ST2006", "תורה שבע\"פ ותלמוד"),
    subject("ST2051", "מורשת דרוזית"),
    subject("ST2040", "נושאים מיוחדים במדע"),
    subject("ST2049", "לימודי אסלאם"),
    subject("ST2050", "לימודי נצרות"),
    subject("ST2022", "ערבית"),
    subject("ST2023", "צרפתית"),
    subject("ST2025", "ספרדית"),
    subject("ST2024", "רוסית"),
    subject("ST2053", "סינית"),
    subject("ST2026", "אמהרית"),
];

impl Subject {
    /// Mathematics, the picker's initial selection.
    pub fn default_subject() -> Subject {
        SUBJECTS[0]
    }

    pub fn find(id: &str) -> Option<Subject> {
        SUBJECTS.iter().copied().find(|s| s.id.eq_ignore_ascii_case(id))
    }
}

impl Default for Subject {
    fn default() -> Self {
        Subject::default_subject()
    }
}
