/// Tables, indexes and seed rows. Idempotent; run on every open.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS columns (
    id         INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name       TEXT NOT NULL,
    prev_id    INTEGER,
    next_id    INTEGER
);

CREATE TABLE IF NOT EXISTS priorities (
    id          INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    color       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS types (
    id          INTEGER PRIMARY KEY,
    description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id          INTEGER PRIMARY KEY,
    column_id   INTEGER NOT NULL REFERENCES columns(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    position    INTEGER NOT NULL,
    priority_id INTEGER NOT NULL DEFAULT 2 REFERENCES priorities(id),
    type_id     INTEGER NOT NULL DEFAULT 1 REFERENCES types(id),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS labels (
    id         INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name       TEXT NOT NULL,
    color      TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS labels_project_name
    ON labels (project_id, name COLLATE NOCASE);

CREATE TABLE IF NOT EXISTS task_labels (
    task_id  INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    label_id INTEGER NOT NULL REFERENCES labels(id) ON DELETE CASCADE,
    PRIMARY KEY (task_id, label_id)
);

CREATE TABLE IF NOT EXISTS relation_types (
    id              INTEGER PRIMARY KEY,
    parent_to_child TEXT NOT NULL,
    child_to_parent TEXT NOT NULL,
    color           TEXT NOT NULL,
    is_blocking     INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS task_relations (
    parent_id        INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    child_id         INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    relation_type_id INTEGER NOT NULL DEFAULT 1 REFERENCES relation_types(id),
    PRIMARY KEY (parent_id, child_id)
);

CREATE TABLE IF NOT EXISTS comments (
    id         INTEGER PRIMARY KEY,
    task_id    INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    message    TEXT NOT NULL,
    author     TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
);

INSERT OR IGNORE INTO priorities (id, description, color) VALUES
    (1, 'trivial',  '#7D78BF'),
    (2, 'low',      '#44FF88'),
    (3, 'medium',   '#FFD700'),
    (4, 'high',     '#FF8844'),
    (5, 'critical', '#FF4444');

INSERT OR IGNORE INTO types (id, description) VALUES
    (1, 'task'),
    (2, 'feature'),
    (3, 'bug');

INSERT OR IGNORE INTO relation_types (id, parent_to_child, child_to_parent, color, is_blocking) VALUES
    (1, 'parent of', 'child of',   '#44DDFF', 0),
    (2, 'blocks',    'blocked by', '#FF4444', 1),
    (3, 'related to', 'related to', '#CC66FF', 0);
";

/// Priority assigned to new tasks
pub const DEFAULT_PRIORITY: i64 = 2;
/// Type assigned to new tasks
pub const DEFAULT_TYPE: i64 = 1;

/// Columns created with the seeded project
pub const DEFAULT_COLUMNS: [&str; 3] = ["Todo", "In Progress", "Done"];
