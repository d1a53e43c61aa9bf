//! Moteur de migrations de schémas de collections.
//!
//! Le magasin de schémas (`json_db`) conserve chaque collection comme un
//! document JSON ; le migrateur applique des enregistrements réversibles
//! (`up`/`down`) dans l'ordre, une seule fois, chacun dans sa transaction.

pub mod json_db;
pub mod utils;
