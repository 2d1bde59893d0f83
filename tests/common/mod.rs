#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ifc_quantities::model::ModelRegistry;
use ifc_quantities::parser::model_from_bytes;

pub const WALL: u64 = 100;
pub const SLAB: u64 = 200;
pub const COLUMN: u64 = 300;
pub const PROXY: u64 = 400;

/// 4 x 0.2 rectangle extruded 3.
pub const WALL_VOLUME: f64 = 2.4;
/// Brep cube with side 2.
pub const SLAB_VOLUME: f64 = 8.0;
/// Circle r = 0.5 extruded 2.
pub const COLUMN_VOLUME: f64 = std::f64::consts::FRAC_PI_2;

pub const EPSILON: f64 = 1e-9;

/// Wraps DATA statements into a complete IFC4 file whose length unit uses
/// `unit_prefix` (`$` for plain metres, `.MILLI.` for millimetres).
pub fn step_document(unit_prefix: &str, body: &str) -> String {
    format!(
        "ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [CoordinationView]'),'2;1');
FILE_NAME('fixture.ifc','2024-01-01T00:00:00',(''),(''),'','','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCOWNERHISTORY($,$,$,.ADDED.,$,$,$,0);
#2=IFCSIUNIT(*,.LENGTHUNIT.,{unit_prefix},.METRE.);
#3=IFCUNITASSIGNMENT((#2));
#4=IFCGEOMETRICREPRESENTATIONCONTEXT($,'Model',3,1.E-05,#6,$);
#5=IFCCARTESIANPOINT((0.,0.,0.));
#6=IFCAXIS2PLACEMENT3D(#5,$,$);
#7=IFCDIRECTION((0.,0.,1.));
#8=IFCAXIS2PLACEMENT2D(#9,$);
#9=IFCCARTESIANPOINT((0.,0.));
#10=IFCPROJECT('0YvctVUKr0kugbFTf53O9L',#1,'Fixture Project',$,$,$,$,(#4),#3);
#20=IFCBUILDINGSTOREY('2FCZDorxHDT8NI01kdXi8P',#1,'Level 1',$,$,$,$,$,.ELEMENT.,0.);
{body}
ENDSEC;
END-ISO-10303-21;
"
    )
}

const ELEMENTS: &str = "\
#30=IFCRELCONTAINEDINSPATIALSTRUCTURE('3Sa3dTJGn0H8TQIGiuGQd5',#1,$,$,(#100,#200,#300,#400),#20);
#100=IFCWALL('1wAll0000000000000000A',#1,'Wall 01',$,$,$,#101,$,$);
#101=IFCPRODUCTDEFINITIONSHAPE($,$,(#102));
#102=IFCSHAPEREPRESENTATION(#4,'Body','SweptSolid',(#103));
#103=IFCEXTRUDEDAREASOLID(#104,#6,#7,3.);
#104=IFCRECTANGLEPROFILEDEF(.AREA.,$,#8,4.,0.2);
#200=IFCSLAB('2sLab0000000000000000B',#1,'Slab 01',$,$,$,#201,$,.FLOOR.);
#201=IFCPRODUCTDEFINITIONSHAPE($,$,(#202));
#202=IFCSHAPEREPRESENTATION(#4,'Body','Brep',(#203));
#203=IFCFACETEDBREP(#204);
#204=IFCCLOSEDSHELL((#211,#212,#213,#214,#215,#216));
#211=IFCFACE((#231));
#212=IFCFACE((#232));
#213=IFCFACE((#233));
#214=IFCFACE((#234));
#215=IFCFACE((#235));
#216=IFCFACE((#236));
#221=IFCCARTESIANPOINT((0.,0.,0.));
#222=IFCCARTESIANPOINT((2.,0.,0.));
#223=IFCCARTESIANPOINT((2.,2.,0.));
#224=IFCCARTESIANPOINT((0.,2.,0.));
#225=IFCCARTESIANPOINT((0.,0.,2.));
#226=IFCCARTESIANPOINT((2.,0.,2.));
#227=IFCCARTESIANPOINT((2.,2.,2.));
#228=IFCCARTESIANPOINT((0.,2.,2.));
#231=IFCFACEOUTERBOUND(#241,.T.);
#232=IFCFACEOUTERBOUND(#242,.T.);
#233=IFCFACEOUTERBOUND(#243,.T.);
#234=IFCFACEOUTERBOUND(#244,.T.);
#235=IFCFACEOUTERBOUND(#245,.T.);
#236=IFCFACEOUTERBOUND(#246,.T.);
#241=IFCPOLYLOOP((#221,#224,#223,#222));
#242=IFCPOLYLOOP((#225,#226,#227,#228));
#243=IFCPOLYLOOP((#221,#222,#226,#225));
#244=IFCPOLYLOOP((#222,#223,#227,#226));
#245=IFCPOLYLOOP((#224,#228,#227,#223));
#246=IFCPOLYLOOP((#221,#225,#228,#224));
#300=IFCCOLUMN('3c0lumn000000000000000C',#1,'Column 01',$,$,$,#301,$,$);
#301=IFCPRODUCTDEFINITIONSHAPE($,$,(#302));
#302=IFCSHAPEREPRESENTATION(#4,'Body','SweptSolid',(#303));
#303=IFCEXTRUDEDAREASOLID(#304,#6,#7,2.);
#304=IFCCIRCLEPROFILEDEF(.AREA.,$,#8,0.5);
#400=IFCBUILDINGELEMENTPROXY('4pr0xy000000000000000D',#1,'Proxy 01',$,$,$,$,$,$);
#500=IFCPROPERTYSINGLEVALUE('IsExternal',$,IFCBOOLEAN(.T.),$);
#501=IFCPROPERTYSET('5pset0000000000000000E',#1,'Pset_WallCommon',$,(#500));
#502=IFCRELDEFINESBYPROPERTIES('6rel00000000000000000F',#1,$,$,(#100),#501);";

/// Wall, slab and column with measurable bodies, a proxy without geometry,
/// and a `Pset_WallCommon` on the wall.
pub fn fixture_ifc() -> String {
    step_document("$", ELEMENTS)
}

/// Loads the fixture into `registry` and returns the new model's id.
pub fn load_fixture(registry: &mut ModelRegistry, name: &str) -> String {
    let model = model_from_bytes(name, fixture_ifc().into_bytes()).unwrap();
    registry.insert(model)
}

pub fn write_fixture(dir: &Path, file_name: &str) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, fixture_ifc()).unwrap();
    path
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}
