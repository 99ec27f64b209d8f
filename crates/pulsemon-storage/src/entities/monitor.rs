use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "monitors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub org_id: String,
    pub project_id: String,
    pub created_by: String,
    pub name: String,
    pub monitor_type: String,
    pub target: String,
    pub frequency_secs: i64,
    pub enabled: bool,
    pub status: String,
    pub config_json: String,
    pub alert_config_json: String,
    pub location_config_json: Option<String>,
    pub muted_until: Option<DateTimeWithTimeZone>,
    pub last_check_at: Option<DateTimeWithTimeZone>,
    pub last_status_change_at: Option<DateTimeWithTimeZone>,
    pub scheduled_job_id: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
