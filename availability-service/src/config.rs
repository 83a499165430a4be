use chrono::NaiveDate;
use clap::Args;

/// Request parameters for the facility's booking widget.
///
/// Defaults point at the Planet Granite reservation offering.
#[derive(Debug, Clone, Args)]
pub struct WidgetConfig {
    #[arg(long, env = "WIDGET_ENDPOINT", default_value = "https://app.rockgympro.com/b/widget/?a=equery")]
    pub endpoint: String,

    #[arg(long, env = "WIDGET_OFFERING_GUID", default_value = "3d2b6cb6c62f4025b4c616a2b77b856f")]
    pub offering_guid: String,

    /// Participant product ids the widget asks a head count for
    #[arg(long = "pid", env = "WIDGET_PIDS", value_delimiter = ',', default_value = "1301,3664346,3664347")]
    pub pids: Vec<u64>,

    #[arg(long, env = "WIDGET_RANDOM", default_value = "603e65c25539a")]
    pub random: String,

    #[arg(
        long,
        env = "WIDGET_USER_AGENT",
        default_value = "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:86.0) Gecko/20100101 Firefox/86.0"
    )]
    pub user_agent: String,

    #[arg(long, env = "WIDGET_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

impl WidgetConfig {
    /// The offering page the widget's own XHR is sent from.
    pub fn referrer(&self) -> String {
        let base = self.endpoint.split('?').next().unwrap_or(&self.endpoint);
        format!(
            "{}?a=offering&offering_guid={}&random={}&iframeid=&mode=p",
            base, self.offering_guid, self.random
        )
    }

    /// Form body of the widget's event query for `date`.
    pub fn form_fields(&self, date: NaiveDate) -> Vec<(String, String)> {
        let limited = format!("limited_to_course_guid_for_offering_guid_{}", self.offering_guid);

        let mut fields = vec![
            field("PreventChromeAutocomplete", ""),
            field("random", &self.random),
            field("iframeid", ""),
            field("mode", "p"),
            field("fctrl_1", "offering_guid"),
            field("offering_guid", &self.offering_guid),
            field("fctrl_2", "course_guid"),
            field("course_guid", ""),
            field("fctrl_3", &limited),
            field(&limited, ""),
            field("fctrl_4", "show_date"),
            field("show_date", &date.format("%Y-%m-%d").to_string()),
        ];

        for (i, pid) in self.pids.iter().enumerate() {
            let counter = format!("pcount-pid-1-{}", pid);
            fields.push(field(&format!("ftagname_0_{}", counter), "pcount"));
            fields.push(field(&format!("ftagval_0_{}", counter), "1"));
            fields.push(field(&format!("ftagname_1_{}", counter), "pid"));
            fields.push(field(&format!("ftagval_1_{}", counter), &pid.to_string()));
            fields.push(field(&format!("fctrl_{}", i + 5), &counter));
            fields.push(field(&counter, "0"));
        }

        fields
    }
}

fn field(name: &str, value: &str) -> (String, String) {
    (name.to_string(), value.to_string())
}
