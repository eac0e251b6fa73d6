use exoquery::prelude::*;
use exoquery::spatial;
use pretty_assertions::assert_eq;

#[test]
fn test_interleaved_chaining() {
    // filter on empty list -> first condition; raw AND append; filter -> AND;
    // set_where wipes; filter -> AND again.
    let builder = QueryBuilder::new()
        .select(["pl_name"])
        .from_table(TableName::PlanetarySystems)
        .where_confirmed()
        .and_where("pl_masse < 10")
        .where_has_radius();
    assert_eq!(
        builder.build().unwrap(),
        "SELECT pl_name FROM ps WHERE upper(soltype) like upper('%CONF%') AND pl_masse < 10 AND pl_rade > 0"
    );

    let replaced = builder.set_where("disc_year > 2015").where_default_flag();
    assert_eq!(
        replaced.build().unwrap(),
        "SELECT pl_name FROM ps WHERE disc_year > 2015 AND default_flag=1"
    );
}

#[test]
fn test_polygon_in_condition() {
    let region = spatial::polygon(&[(217.0, -62.0), (218.0, -62.0), (218.0, -63.0)], spatial::ICRS)
        .unwrap();
    let query = QueryBuilder::new()
        .select_all()
        .from_table("ps")
        .and_where(&region)
        .build()
        .unwrap();
    assert_eq!(
        query,
        "SELECT * FROM ps WHERE contains(point('icrs',ra,dec),polygon('icrs',217,-62,218,-62,218,-63))=1"
    );
}

#[test]
fn test_failed_build_keeps_state() {
    let builder = QueryBuilder::new().select(["a"]).set_where("x=1").limit(3);
    assert!(matches!(builder.build(), Err(ExoError::Validation(_))));
    let fixed = builder.from_table("toi");
    assert_eq!(fixed.build().unwrap(), "SELECT TOP 3 a FROM toi WHERE x=1");
}

#[test]
fn test_request_url_round_trip() {
    let query = QueryBuilder::new()
        .select(["pl_name", "ra", "dec"])
        .from_table(TableName::PlanetarySystems)
        .where_spatial_circle(217.42896, -62.67947, 0.1);
    let url = TapEndpoint::default()
        .request_url(&query, OutputFormat::Json, exoquery::tap::QueryMode::Sync)
        .unwrap();
    assert_eq!(
        url,
        "https://exoplanetarchive.ipac.caltech.edu/TAP/sync?query=SELECT+pl_name,ra,dec+FROM+ps+WHERE+contains%28point%28%27icrs%27,ra,dec%29,circle%28%27icrs%27,217.42896,-62.67947,0.1%29%29=1&format=json"
    );
}
