//! SQL schema for the coop SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS legal_statuses (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    label  TEXT NOT NULL,
    slug   TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS transverse_themes (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS roles (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid   TEXT NOT NULL UNIQUE,
    label  TEXT NOT NULL,
    slug   TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS organizations (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid             TEXT NOT NULL UNIQUE,
    title            TEXT NOT NULL,
    acronym          TEXT,
    description      TEXT,
    web              TEXT,
    birth            TEXT,   -- YYYY-MM-DD or NULL
    legal_status_id  INTEGER REFERENCES legal_statuses(id) ON DELETE SET NULL,
    pref_phone_id    INTEGER REFERENCES contacts(id)       ON DELETE SET NULL,
    pref_email_id    INTEGER REFERENCES contacts(id)       ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS persons (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid           TEXT NOT NULL UNIQUE,
    first_name     TEXT NOT NULL,
    last_name      TEXT NOT NULL,
    pref_email_id  INTEGER REFERENCES contacts(id) ON DELETE SET NULL
);

-- A contact belongs to exactly one organization or person.
CREATE TABLE IF NOT EXISTS contacts (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid             TEXT NOT NULL UNIQUE,
    content          TEXT NOT NULL,
    organization_id  INTEGER REFERENCES organizations(id) ON DELETE CASCADE,
    person_id        INTEGER REFERENCES persons(id)       ON DELETE CASCADE,
    CHECK ((organization_id IS NULL) <> (person_id IS NULL))
);

CREATE TABLE IF NOT EXISTS organization_themes (
    organization_id  INTEGER NOT NULL REFERENCES organizations(id)     ON DELETE CASCADE,
    theme_id         INTEGER NOT NULL REFERENCES transverse_themes(id) ON DELETE CASCADE,
    PRIMARY KEY (organization_id, theme_id)
);

CREATE TABLE IF NOT EXISTS engagements (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    organization_id  INTEGER NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    person_id        INTEGER NOT NULL REFERENCES persons(id)       ON DELETE CASCADE,
    role_id          INTEGER NOT NULL REFERENCES roles(id)         ON DELETE CASCADE
);

-- Foreign links are one-to-one on both sides and never updated.
CREATE TABLE IF NOT EXISTS foreign_organizations (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    local_id      INTEGER NOT NULL UNIQUE REFERENCES organizations(id) ON DELETE CASCADE,
    foreign_id    TEXT    NOT NULL UNIQUE,
    linked_at     TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS foreign_persons (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    local_id      INTEGER NOT NULL UNIQUE REFERENCES persons(id) ON DELETE CASCADE,
    foreign_id    TEXT    NOT NULL UNIQUE,
    linked_at     TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS foreign_roles (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    local_id      INTEGER NOT NULL UNIQUE REFERENCES roles(id) ON DELETE CASCADE,
    foreign_id    TEXT    NOT NULL UNIQUE,
    linked_at     TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS contacts_organization_idx ON contacts(organization_id);
CREATE INDEX IF NOT EXISTS contacts_person_idx       ON contacts(person_id);
CREATE INDEX IF NOT EXISTS engagements_org_idx       ON engagements(organization_id);

PRAGMA user_version = 1;
";
