//! Where things live on each portal.
//!
//! Defaults are the production markup; tests build their own catalogues
//! with zero settle delays.

use std::time::Duration;

use crate::Locator;

/// Search-and-listing portal.
#[derive(Debug, Clone)]
pub struct ListingPortal {
    pub login_url: String,
    pub username: Locator,
    pub password: Locator,
    pub password_fallback: Locator,
    pub login_button: Locator,
    /// Present only once the user is fully logged in.
    pub landmark: Locator,
    pub search_input: Locator,
    pub search_button: Locator,
    pub filters_toggle: Locator,
    pub active_select: Locator,
    pub active_option_text: String,
    pub rta_input: Locator,
    pub city_input: Locator,
    pub street_input: Locator,
    pub apply_button: Locator,
    pub apply_button_fallback: Locator,
    pub list: Locator,
    pub list_row: Locator,
    pub row_link: Locator,
    pub range_indicator: Locator,
    pub next_control: Locator,
    /// Substring of the next control's `src` marking the last page.
    pub next_disabled_marker: String,
    pub detail_table: Locator,
    pub detail_cell: Locator,
    pub password_timeout: Duration,
    pub filters_timeout: Duration,
    pub apply_fallback_timeout: Duration,
    pub range_timeout: Duration,
    pub next_timeout: Duration,
    /// Bound on the old list going stale after the next control is clicked.
    pub stale_timeout: Duration,
    /// Bound on the list reappearing after a detail tab closes.
    pub return_timeout: Duration,
    pub after_search: Duration,
    pub after_apply: Duration,
}

impl Default for ListingPortal {
    fn default() -> Self {
        Self {
            login_url: "https://v.my.site.com/resi/login".to_string(),
            username: Locator::id("username"),
            password: Locator::name("pw"),
            password_fallback: Locator::id("password"),
            login_button: Locator::id("Login"),
            landmark: Locator::id("phSearchInput"),
            search_input: Locator::id("phSearchInput"),
            search_button: Locator::id("phSearchButton"),
            filters_toggle: Locator::css(
                "#showFiltersId-Residences__c-a0r, a.customizeColumns.filterFields",
            ),
            active_select: Locator::id("00Nd0000008BIlSEAWResidences__c"),
            active_option_text: "Oui".to_string(),
            rta_input: Locator::id("00Nd0000008B6CMEA0Residences__c"),
            city_input: Locator::id("00Nd0000008ASBbEAOResidences__c"),
            street_input: Locator::id("00Nd0000008B6ClEAKResidences__c"),
            apply_button: Locator::id("save_filter_Residences__c"),
            apply_button_fallback: Locator::xpath("//input[@value='Appliquer les filtres']"),
            list: Locator::css("table.list"),
            list_row: Locator::css("table.list tr.dataRow"),
            row_link: Locator::css("table.list tr.dataRow th a"),
            range_indicator: Locator::css(".itemsRange"),
            next_control: Locator::css(".pSearchShowMore a.nextArrow > img"),
            next_disabled_marker: "disabled".to_string(),
            detail_table: Locator::css("#ep table.detailList"),
            detail_cell: Locator::css("td"),
            password_timeout: Duration::from_secs(10),
            filters_timeout: Duration::from_secs(8),
            apply_fallback_timeout: Duration::from_secs(5),
            range_timeout: Duration::from_secs(5),
            next_timeout: Duration::from_secs(5),
            stale_timeout: Duration::from_secs(10),
            return_timeout: Duration::from_secs(5),
            after_search: Duration::from_secs(1),
            after_apply: Duration::from_secs(5),
        }
    }
}

/// Account-detail portal with a collapsible search panel.
#[derive(Debug, Clone)]
pub struct AccountPortal {
    pub url: String,
    pub username: Locator,
    pub password: Locator,
    pub submit: Locator,
    pub continue_button: Locator,
    pub account_input: Locator,
    pub search_toggle: Locator,
    pub reopen: Locator,
    pub search_button: Locator,
    pub header: Locator,
    pub requester: Locator,
    pub contact: Locator,
    pub continue_timeout: Duration,
    pub header_attempts: u32,
    pub header_pause: Duration,
    pub phone_attempts: u32,
    /// The wait after failed phone check `n` is `phone_backoff * n`.
    pub phone_backoff: Duration,
}

impl Default for AccountPortal {
    fn default() -> Self {
        Self {
            url: "https://clicplus.int.videotron.com/vui/#/clic/infos-externes".to_string(),
            username: Locator::css("input[name='userName']"),
            password: Locator::css("input[name='password']"),
            submit: Locator::css("button[data-qa='clic_infos-externes_StyledButton']"),
            continue_button: Locator::xpath(
                "//button[@data-qa='clic_infos-externes_StyledButton'][normalize-space(.//span)='Continuer']",
            ),
            account_input: Locator::css("input[name='account.sgaAccountNumber']"),
            search_toggle: Locator::css(".search_wrapper___39tl7 a, .fa-search"),
            reopen: Locator::xpath(
                "//*[(self::span or self::i) and contains(@class,'fa-search')]/ancestor::a[1]",
            ),
            search_button: Locator::xpath(
                "//button[@data-qa='_StyledButton' and descendant::span[normalize-space()='Rechercher']]",
            ),
            header: Locator::css("[data-qa='clic__Header'], .header_container___mGxJS"),
            requester: Locator::css("[data-qa='clic__Header'] [data-qa='clic__Requerant']"),
            contact: Locator::css("[data-qa='clic__Contact']"),
            continue_timeout: Duration::from_secs(30),
            header_attempts: 3,
            header_pause: Duration::from_secs(2),
            phone_attempts: 3,
            phone_backoff: Duration::from_secs(5),
        }
    }
}

/// Modal-dialog portal used for long identifiers.
#[derive(Debug, Clone)]
pub struct ModalPortal {
    pub dashboard_url: String,
    pub modal: Locator,
    pub postal_code: Locator,
    pub operator_code: Locator,
    pub submit: Locator,
    pub user_icon: Locator,
    pub customer_id: Locator,
    /// How many trailing digits of the identifier go into the customer field.
    pub customer_digits: usize,
    pub panel: Locator,
    pub entry: Locator,
    pub entry_key: Locator,
    pub entry_value: Locator,
    pub phone_label: String,
    pub phone_prefix: String,
    pub email_label: String,
    pub keystroke_pause: Duration,
    pub panel_timeout: Duration,
}

impl Default for ModalPortal {
    fn default() -> Self {
        Self {
            dashboard_url: "https://csr.etiya.videotron.com/private/dashboard".to_string(),
            modal: Locator::css(
                "div[role='document'].modal-dialog.modal-dialog-centered.modal-sm",
            ),
            postal_code: Locator::css("input[role='combobox']#postal-code"),
            operator_code: Locator::css(
                "atoms-input-with-label#work-site-user-number input.form-control",
            ),
            submit: Locator::css("button#Submit-btn"),
            user_icon: Locator::css("svg.icon-light.svg-size--4"),
            customer_id: Locator::id("custId"),
            customer_digits: 7,
            panel: Locator::css("div[csrcollapse].collapse.show"),
            entry: Locator::css("atoms-key-value"),
            entry_key: Locator::css("li.key"),
            entry_value: Locator::css("li.value"),
            phone_label: "NUMÉRO DE TÉLÉPHONE PRINCIPAL".to_string(),
            phone_prefix: "Mobile - ".to_string(),
            email_label: "NOM D'UTILISATEUR".to_string(),
            keystroke_pause: Duration::from_millis(700),
            panel_timeout: Duration::from_secs(30),
        }
    }
}
