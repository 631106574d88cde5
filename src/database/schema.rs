/// Target schema. Foreign keys carry no ON DELETE action: deletes go through
/// the policy table in [`super::policy`].
pub const CURRENT_SCHEMA: &str = r#"
CREATE TABLE students (
    code TEXT PRIMARY KEY NOT NULL,
    full_name TEXT NOT NULL,
    email TEXT
);

CREATE TABLE advisors (
    code TEXT PRIMARY KEY NOT NULL,
    full_name TEXT NOT NULL,
    email TEXT NOT NULL
);

CREATE TABLE evaluators (
    code TEXT PRIMARY KEY NOT NULL,
    full_name TEXT NOT NULL,
    email TEXT NOT NULL,
    specialization TEXT NOT NULL
);

CREATE TABLE initial_documentation (
    folio TEXT PRIMARY KEY NOT NULL,
    introduction TEXT NOT NULL,
    justification TEXT NOT NULL,
    objective TEXT NOT NULL,
    summary TEXT NOT NULL
);

CREATE TABLE projects (
    folio TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    modality TEXT NOT NULL CHECK (modality IN (
        'RESEARCH_WORK', 'EDUCATIONAL_MATERIALS', 'PROTOTYPE', 'REPORT', 'SOCIAL_OUTREACH'
    )),
    variant TEXT,
    competency_level TEXT,
    ruling TEXT NOT NULL DEFAULT 'PENDING',
    registration_period TEXT NOT NULL,
    evidence_url TEXT,
    ruling_document_url TEXT,
    advisor TEXT,
    evaluator TEXT,
    documentation TEXT UNIQUE,
    FOREIGN KEY (advisor) REFERENCES advisors (code),
    FOREIGN KEY (evaluator) REFERENCES evaluators (code),
    FOREIGN KEY (documentation) REFERENCES initial_documentation (folio)
);

CREATE TABLE participations (
    project TEXT NOT NULL,
    student TEXT NOT NULL,
    is_representative BOOLEAN NOT NULL DEFAULT FALSE,
    PRIMARY KEY (project, student),
    FOREIGN KEY (project) REFERENCES projects (folio),
    FOREIGN KEY (student) REFERENCES students (code)
);

CREATE TABLE extension_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project TEXT NOT NULL,
    justification TEXT NOT NULL,
    presentation_period TEXT NOT NULL,
    FOREIGN KEY (project) REFERENCES projects (folio)
);

CREATE TABLE evaluations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project TEXT NOT NULL,
    evaluator TEXT,
    evaluated_at TIMESTAMP NOT NULL,
    review_type TEXT NOT NULL DEFAULT 'FORM_REVIEW' CHECK (review_type IN (
        'FORM_REVIEW', 'CONTENT_REVIEW', 'FINAL_RULING'
    )),
    resolution TEXT NOT NULL CHECK (resolution IN (
        'APPROVED', 'REJECTED', 'PENDING_CORRECTIONS', 'NOT_APPLICABLE'
    )),
    remarks TEXT NOT NULL,
    FOREIGN KEY (project) REFERENCES projects (folio),
    FOREIGN KEY (evaluator) REFERENCES evaluators (code)
);

CREATE INDEX idx_projects_registration_period ON projects (registration_period);
CREATE INDEX idx_projects_advisor ON projects (advisor);
CREATE INDEX idx_projects_evaluator ON projects (evaluator);
CREATE INDEX idx_participations_student ON participations (student);
CREATE INDEX idx_extension_requests_project ON extension_requests (project);
CREATE INDEX idx_evaluations_project ON evaluations (project, evaluated_at);
"#;

/// (table, column) of every single-column natural key.
pub const RECORD_KEYS: &[(&str, &str)] = &[
    ("students", "code"),
    ("advisors", "code"),
    ("evaluators", "code"),
    ("initial_documentation", "folio"),
    ("projects", "folio"),
];
